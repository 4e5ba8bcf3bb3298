//! Shared models for the Bitunix futures market-data API.
//!
//! Contains channel definitions, symbol normalization, subscription and
//! heartbeat request types, and the envelope every inbound WebSocket frame
//! is first parsed into.

pub mod depth;
pub mod kline;
pub mod ticker;
pub mod trade;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Quote currency appended to bare base symbols (`BTC` -> `BTCUSDT`).
pub const QUOTE_SUFFIX: &str = "USDT";

/// Normalizes a configured symbol into its exchange-qualified form.
///
/// Input is trimmed and uppercased, and [`QUOTE_SUFFIX`] is appended when
/// absent. Already-qualified symbols pass through unchanged, so the function
/// is idempotent. Returns `None` for blank input.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let symbol = raw.trim().to_ascii_uppercase();
    if symbol.is_empty() {
        return None;
    }
    if symbol.ends_with(QUOTE_SUFFIX) {
        Some(symbol)
    } else {
        Some(format!("{symbol}{QUOTE_SUFFIX}"))
    }
}

/// Normalizes a list of symbols, dropping blanks and duplicates while
/// keeping first-seen order.
pub fn normalize_symbols<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for symbol in raw.iter().filter_map(|s| normalize_symbol(s.as_ref())) {
        if !out.contains(&symbol) {
            out.push(symbol);
        }
    }
    out
}

/// Milliseconds since the Unix epoch, or 0 if the clock is before it.
pub(crate) fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}

/// Public data channels the feed client forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "ticker")]
    Ticker,
    #[serde(rename = "trade")]
    Trade,
    /// Best bid/ask only (wire name: `"depth_book1"`).
    #[serde(rename = "depth_book1")]
    DepthBook1,
}

impl Channel {
    /// Every channel on the inbound allow-list.
    pub const ALL: [Channel; 3] = [Channel::Ticker, Channel::Trade, Channel::DepthBook1];

    /// Returns the wire-format channel name expected by the Bitunix API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Ticker => "ticker",
            Channel::Trade => "trade",
            Channel::DepthBook1 => "depth_book1",
        }
    }

    /// Looks up an allow-listed channel by its wire name.
    pub fn from_wire(name: &str) -> Option<Channel> {
        Channel::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

/// Symbols and channel kinds to request in one subscribe frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionConfig {
    pub symbols: Vec<String>,
    pub channels: Vec<Channel>,
}

impl SubscriptionConfig {
    /// Builds a subscription, normalizing the symbols.
    pub fn new<S: AsRef<str>>(symbols: &[S], channels: &[Channel]) -> Self {
        Self {
            symbols: normalize_symbols(symbols),
            channels: channels.to_vec(),
        }
    }

    /// Expands into one argument per (symbol, channel) pair.
    pub fn args(&self) -> Vec<SubscriptionArg> {
        self.symbols
            .iter()
            .flat_map(|symbol| {
                self.channels.iter().map(move |channel| SubscriptionArg {
                    symbol: symbol.clone(),
                    ch: channel.as_str().to_string(),
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() || self.channels.is_empty()
    }
}

/// A `subscribe` request sent to the Bitunix WebSocket API.
#[derive(Debug, Serialize)]
pub struct SubscribeRequest {
    pub op: String,
    pub args: Vec<SubscriptionArg>,
}

impl SubscribeRequest {
    pub fn new(subscription: &SubscriptionConfig) -> Self {
        Self {
            op: "subscribe".to_string(),
            args: subscription.args(),
        }
    }
}

/// One `{symbol, ch}` entry of a subscribe request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionArg {
    pub symbol: String,
    pub ch: String,
}

/// A heartbeat `ping` carrying the client's wall-clock time in ms.
#[derive(Debug, Serialize)]
pub struct PingRequest {
    pub op: String,
    pub ping: i64,
}

impl PingRequest {
    pub fn new(ping: i64) -> Self {
        Self {
            op: "ping".to_string(),
            ping,
        }
    }

    /// A ping stamped with the current time.
    pub fn now() -> Self {
        Self::new(unix_millis())
    }
}

/// Envelope every inbound text frame is parsed into before routing.
///
/// Control frames carry `op`; data frames carry `ch` and `data`.
#[derive(Debug, Deserialize)]
pub struct InboundFrame {
    #[serde(default)]
    pub op: Option<String>,
    #[serde(default)]
    pub ch: Option<String>,
    /// Frame-level symbol, used when the payload items omit their own.
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub ts: Option<i64>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Payloads that arrive either as a single object or as an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_appends_suffix_once() {
        assert_eq!(normalize_symbol("btc").as_deref(), Some("BTCUSDT"));
        assert_eq!(normalize_symbol(" eth ").as_deref(), Some("ETHUSDT"));
        assert_eq!(normalize_symbol("SOLUSDT").as_deref(), Some("SOLUSDT"));
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["btc", "ETHUSDT", "doge", "pepeusdt"] {
            let once = normalize_symbol(raw).unwrap();
            let twice = normalize_symbol(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn normalize_rejects_blank() {
        assert_eq!(normalize_symbol(""), None);
        assert_eq!(normalize_symbol("   "), None);
    }

    #[test]
    fn normalize_symbols_dedups_in_order() {
        let out = normalize_symbols(&["eth", "BTC", "ETHUSDT", "", "btcusdt"]);
        assert_eq!(out, vec!["ETHUSDT", "BTCUSDT"]);
    }

    #[test]
    fn channel_wire_lookup() {
        assert_eq!(Channel::from_wire("depth_book1"), Some(Channel::DepthBook1));
        assert_eq!(Channel::from_wire("ticker"), Some(Channel::Ticker));
        assert_eq!(Channel::from_wire("kline_1m"), None);
    }

    #[test]
    fn subscription_expands_symbol_channel_pairs() {
        let sub = SubscriptionConfig::new(&["btc", "eth"], &[Channel::Ticker, Channel::Trade]);
        let args = sub.args();
        assert_eq!(args.len(), 4);
        assert_eq!(args[0].symbol, "BTCUSDT");
        assert_eq!(args[0].ch, "ticker");
        assert_eq!(args[3].symbol, "ETHUSDT");
        assert_eq!(args[3].ch, "trade");
    }

    #[test]
    fn one_or_many_accepts_both_shapes() {
        let many: OneOrMany<u32> = serde_json::from_str("[1,2]").unwrap();
        let one: OneOrMany<u32> = serde_json::from_str("3").unwrap();
        assert_eq!(many.into_vec(), vec![1, 2]);
        assert_eq!(one.into_vec(), vec![3]);
    }
}
