//! Application configuration loaded from a JSON file and environment
//! variables.
//!
//! Every field has a default (3 s visible, 1.5 s fades, 5 s reconnect
//! delay, 3 s heartbeat), so a file only needs to list the symbols.
//! Environment variables override the file:
//! - `TICKER_SYMBOLS`: comma-separated symbols
//! - `TICKER_WEBSOCKET_URL`: public WebSocket endpoint
//! - `TICKER_REST_URL`: REST base URL

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::display::format::MissingBaseline;
use crate::display::rotation::DisplayMode;
use crate::models::{Channel, normalize_symbols};
use crate::{Result, TickerError};

/// Default public WebSocket endpoint.
pub const DEFAULT_WEBSOCKET_URL: &str = "wss://fapi.bitunix.com/public/";

/// Default REST base URL.
pub const DEFAULT_REST_URL: &str = "https://fapi.bitunix.com";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(alias = "stocks")]
    pub symbols: Vec<SymbolEntry>,
    pub acquisition: AcquisitionMode,
    pub display: DisplayConfig,
    pub rest: RestConfig,
    pub websocket: WebSocketConfig,
}

/// A configured symbol, either `"BTC"` or `{ "symbol": "BTC" }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SymbolEntry {
    Plain(String),
    Object { symbol: String },
}

impl SymbolEntry {
    pub fn as_str(&self) -> &str {
        match self {
            SymbolEntry::Plain(s) => s,
            SymbolEntry::Object { symbol } => symbol,
        }
    }
}

/// Where ticker data comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMode {
    /// Batch REST fetches, refreshed once per rotation cycle.
    #[default]
    Rest,
    /// WebSocket ticker stream only.
    Websocket,
    /// REST for the full set and cycle refreshes, WebSocket for live patches.
    Hybrid,
}

impl AcquisitionMode {
    pub fn uses_rest(self) -> bool {
        matches!(self, AcquisitionMode::Rest | AcquisitionMode::Hybrid)
    }

    pub fn uses_websocket(self) -> bool {
        matches!(self, AcquisitionMode::Websocket | AcquisitionMode::Hybrid)
    }
}

/// Rotation and formatting settings handed to the display layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub mode: DisplayMode,
    /// Seconds a symbol stays fully visible.
    #[serde(alias = "fadingSpeed")]
    pub visible_secs: f64,
    /// Seconds for each of the fade-in and fade-out; zero switches instantly.
    #[serde(alias = "fadingTime")]
    pub fade_secs: f64,
    /// Seconds per scroll step in [`DisplayMode::Scroll`].
    pub scroll_step_secs: f64,
    #[serde(alias = "showChangePercent")]
    pub show_change_percent: bool,
    pub missing_baseline: MissingBaseline,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            mode: DisplayMode::Rotate,
            visible_secs: 3.0,
            fade_secs: 1.5,
            scroll_step_secs: 2.0,
            show_change_percent: true,
            missing_baseline: MissingBaseline::Zero,
        }
    }
}

impl DisplayConfig {
    /// How long each symbol stays on screen between fades.
    pub fn visible_for(&self) -> Duration {
        match self.mode {
            DisplayMode::Rotate => secs(self.visible_secs),
            DisplayMode::Scroll => secs(self.scroll_step_secs),
        }
    }

    /// Fade duration; scrolling never cross-fades.
    pub fn fade(&self) -> Duration {
        match self.mode {
            DisplayMode::Rotate => secs(self.fade_secs),
            DisplayMode::Scroll => Duration::ZERO,
        }
    }
}

/// REST polling settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RestConfig {
    pub base_url: String,
    pub timeout_secs: f64,
    /// Retry interval while no data is displayed (failed or empty fetch).
    #[serde(alias = "updateInterval")]
    pub poll_interval_ms: u64,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REST_URL.to_string(),
            timeout_secs: 10.0,
            poll_interval_ms: 30_000,
        }
    }
}

impl RestConfig {
    pub fn timeout(&self) -> Duration {
        secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// WebSocket feed settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    #[serde(alias = "public_uri")]
    pub url: String,
    #[serde(alias = "reconnect_interval")]
    pub reconnect_interval_secs: f64,
    pub heartbeat_secs: f64,
    pub channels: Vec<Channel>,
    /// Capacity of the broadcast event channel.
    pub event_buffer: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WEBSOCKET_URL.to_string(),
            reconnect_interval_secs: 5.0,
            heartbeat_secs: 3.0,
            channels: vec![Channel::Ticker],
            event_buffer: 1024,
        }
    }
}

impl WebSocketConfig {
    pub fn reconnect_delay(&self) -> Duration {
        secs(self.reconnect_interval_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        secs(self.heartbeat_secs)
    }
}

impl AppConfig {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::Config`] if the file cannot be read and
    /// [`TickerError::Json`] if it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TickerError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Defaults overridden by environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Applies `TICKER_*` environment overrides in place.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(non_empty_var);
    }

    /// Applies overrides from an arbitrary lookup; empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(symbols) = lookup("TICKER_SYMBOLS") {
            self.symbols = symbols
                .split(',')
                .map(|s| SymbolEntry::Plain(s.trim().to_string()))
                .collect();
        }
        if let Some(url) = lookup("TICKER_WEBSOCKET_URL") {
            self.websocket.url = url;
        }
        if let Some(url) = lookup("TICKER_REST_URL") {
            self.rest.base_url = url;
        }
    }

    /// Normalized, de-duplicated symbols in configured order.
    pub fn normalized_symbols(&self) -> Vec<String> {
        let raw: Vec<&str> = self.symbols.iter().map(SymbolEntry::as_str).collect();
        normalize_symbols(&raw)
    }

    /// Checks for structural misconfiguration.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::EmptySymbols`] when no usable symbol is
    /// configured, or [`TickerError::Config`] for durations that round to
    /// zero (only the fade may be zero).
    pub fn validate(&self) -> Result<()> {
        if self.normalized_symbols().is_empty() {
            return Err(TickerError::EmptySymbols);
        }
        let checks = [
            ("display.visible_secs", self.display.visible_secs, false),
            ("display.fade_secs", self.display.fade_secs, true),
            ("display.scroll_step_secs", self.display.scroll_step_secs, false),
            ("rest.timeout_secs", self.rest.timeout_secs, false),
            ("websocket.reconnect_interval_secs", self.websocket.reconnect_interval_secs, false),
            ("websocket.heartbeat_secs", self.websocket.heartbeat_secs, false),
        ];
        // judged on the converted duration: sub-nanosecond values round to zero
        for (name, value, zero_ok) in checks {
            let valid = value.is_finite() && value >= 0.0 && (zero_ok || !secs(value).is_zero());
            if !valid {
                return Err(TickerError::Config(format!(
                    "{name} must be at least 1ns, got {value}"
                )));
            }
        }
        if self.rest.poll_interval_ms == 0 {
            return Err(TickerError::Config("rest.poll_interval_ms must be positive".to_string()));
        }
        if self.websocket.event_buffer == 0 {
            return Err(TickerError::Config("websocket.event_buffer must be positive".to_string()));
        }
        if self.acquisition.uses_websocket() && self.websocket.channels.is_empty() {
            return Err(TickerError::Config("websocket.channels must not be empty".to_string()));
        }
        Ok(())
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.display.visible_for(), Duration::from_secs(3));
        assert_eq!(config.display.fade(), Duration::from_millis(1500));
        assert_eq!(config.websocket.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(config.websocket.heartbeat_interval(), Duration::from_secs(3));
        assert_eq!(config.rest.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.websocket.url, DEFAULT_WEBSOCKET_URL);
    }

    #[test]
    fn overrides_replace_symbols_and_urls() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup_from(&[
            ("TICKER_SYMBOLS", "btc, eth ,SOLUSDT"),
            ("TICKER_WEBSOCKET_URL", "wss://custom.example.com"),
        ]));
        assert_eq!(config.normalized_symbols(), vec!["BTCUSDT", "ETHUSDT", "SOLUSDT"]);
        assert_eq!(config.websocket.url, "wss://custom.example.com");
        assert_eq!(config.rest.base_url, DEFAULT_REST_URL);
    }

    #[test]
    fn empty_values_treated_as_absent() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup_from(&[
            ("TICKER_SYMBOLS", ""),
            ("TICKER_REST_URL", "  "),
        ]));
        assert!(config.symbols.is_empty());
        assert_eq!(config.rest.base_url, DEFAULT_REST_URL);
    }

    #[test]
    fn validate_rejects_empty_symbols() {
        let err = AppConfig::default().validate().unwrap_err();
        assert!(matches!(err, TickerError::EmptySymbols));
    }

    #[test]
    fn validate_allows_zero_fade_only() {
        let mut config = AppConfig {
            symbols: vec![SymbolEntry::Plain("btc".to_string())],
            ..AppConfig::default()
        };
        config.display.fade_secs = 0.0;
        assert!(config.validate().is_ok());

        config.display.visible_secs = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("display.visible_secs"));
    }

    #[test]
    fn validate_rejects_durations_that_round_to_zero() {
        let mut config = AppConfig {
            symbols: vec![SymbolEntry::Plain("btc".to_string())],
            ..AppConfig::default()
        };
        config.websocket.heartbeat_secs = 1e-10;
        assert_eq!(config.websocket.heartbeat_interval(), Duration::ZERO);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("websocket.heartbeat_secs"));

        config.websocket.heartbeat_secs = 3.0;
        config.display.visible_secs = 1e-12;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("display.visible_secs"));

        config.display.visible_secs = 3.0;
        config.websocket.reconnect_interval_secs = -1.0;
        assert!(config.validate().is_err());

        config.websocket.reconnect_interval_secs = 5.0;
        config.display.fade_secs = 1e-10;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn scroll_mode_never_fades() {
        let display = DisplayConfig {
            mode: DisplayMode::Scroll,
            ..DisplayConfig::default()
        };
        assert_eq!(display.fade(), Duration::ZERO);
        assert_eq!(display.visible_for(), Duration::from_secs(2));
    }
}
