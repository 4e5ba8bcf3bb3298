//! Ticker models: the normalized [`TickerRecord`] shared by every producer
//! and the display, plus the REST and WebSocket wire shapes it is built from.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::{QUOTE_SUFFIX, normalize_symbol};

/// Normalized ticker for a single symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerRecord {
    /// Exchange-qualified symbol, e.g. `"BTCUSDT"`.
    pub symbol: String,
    pub last_price: Decimal,
    /// Signed 24h change in percent, rounded to 2 decimals.
    pub change_percent: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub volume_base: Decimal,
    pub volume_quote: Decimal,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub bid_volume: Option<Decimal>,
    pub ask_volume: Option<Decimal>,
    /// Set when no usable 24h reference price was available and
    /// `change_percent` fell back to zero.
    pub baseline_missing: bool,
}

impl TickerRecord {
    /// A record carrying only a price, used by tests and partial producers.
    pub fn new(symbol: impl Into<String>, last_price: Decimal, change_percent: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            last_price,
            change_percent,
            high_price: Decimal::ZERO,
            low_price: Decimal::ZERO,
            volume_base: Decimal::ZERO,
            volume_quote: Decimal::ZERO,
            bid: None,
            ask: None,
            bid_volume: None,
            ask_volume: None,
            baseline_missing: false,
        }
    }

    /// Symbol without the quote suffix (`BTCUSDT` -> `BTC`).
    pub fn display_symbol(&self) -> &str {
        self.symbol
            .strip_suffix(QUOTE_SUFFIX)
            .filter(|base| !base.is_empty())
            .unwrap_or(self.symbol.as_str())
    }
}

/// Percentage change of `last` against `reference`, rounded to 2 decimals.
///
/// Returns `None` when the reference is missing or not positive.
pub fn change_percent(last: Decimal, reference: Option<Decimal>) -> Option<Decimal> {
    let reference = reference.filter(|r| *r > Decimal::ZERO)?;
    let change = last
        .checked_sub(reference)?
        .checked_div(reference)?
        .checked_mul(Decimal::ONE_HUNDRED)?;
    Some(change.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Ordered, duplicate-free sequence of tickers plus the time it was produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerSet {
    records: Vec<TickerRecord>,
    /// Unix milliseconds of the producing fetch or frame.
    last_update: Option<i64>,
}

impl TickerSet {
    /// Builds a set, keeping the first occurrence of each symbol.
    pub fn new(records: Vec<TickerRecord>, last_update: Option<i64>) -> Self {
        let mut unique: Vec<TickerRecord> = Vec::with_capacity(records.len());
        for record in records {
            if !unique.iter().any(|r| r.symbol == record.symbol) {
                unique.push(record);
            }
        }
        Self {
            records: unique,
            last_update,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[TickerRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TickerRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last_update(&self) -> Option<i64> {
        self.last_update
    }

    pub(crate) fn set_last_update(&mut self, ts: Option<i64>) {
        if ts.is_some() {
            self.last_update = ts;
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&TickerRecord> {
        self.records.iter().find(|r| r.symbol == symbol)
    }

    pub(crate) fn get_mut(&mut self, symbol: &str) -> Option<&mut TickerRecord> {
        self.records.iter_mut().find(|r| r.symbol == symbol)
    }

    pub fn position(&self, symbol: &str) -> Option<usize> {
        self.records.iter().position(|r| r.symbol == symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.position(symbol).is_some()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.symbol.as_str())
    }

    /// Reorders the set to follow `order`; symbols not listed keep their
    /// relative order after the listed ones.
    pub fn sorted_by_symbols(self, order: &[String]) -> Self {
        let mut records = self.records;
        records.sort_by_key(|r| {
            order
                .iter()
                .position(|s| *s == r.symbol)
                .unwrap_or(order.len())
        });
        Self {
            records,
            last_update: self.last_update,
        }
    }
}

/// Response of `GET /api/v1/futures/market/tickers`.
#[derive(Debug, Deserialize)]
pub struct TickersResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Vec<RestTicker>,
}

/// One entry of the batch ticker endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestTicker {
    pub symbol: String,
    pub last_price: Decimal,
    #[serde(default)]
    pub high: Decimal,
    #[serde(default)]
    pub low: Decimal,
    #[serde(default)]
    pub base_vol: Decimal,
    #[serde(default)]
    pub quote_vol: Decimal,
}

impl RestTicker {
    /// Builds a record using `reference_close` as the 24h baseline.
    pub fn into_record(self, reference_close: Option<Decimal>) -> Option<TickerRecord> {
        let symbol = normalize_symbol(&self.symbol)?;
        let change = change_percent(self.last_price, reference_close);
        Some(TickerRecord {
            symbol,
            last_price: self.last_price,
            change_percent: change.unwrap_or(Decimal::ZERO),
            high_price: self.high,
            low_price: self.low,
            volume_base: self.base_vol,
            volume_quote: self.quote_vol,
            bid: None,
            ask: None,
            bid_volume: None,
            ask_volume: None,
            baseline_missing: change.is_none(),
        })
    }
}

/// Payload item of the `ticker` WebSocket channel.
///
/// Bitunix pushes abbreviated keys; the long REST-style names are accepted
/// as aliases.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamTicker {
    #[serde(rename = "s", alias = "symbol", default)]
    pub symbol: Option<String>,
    #[serde(rename = "la", alias = "lastPrice")]
    pub last_price: Decimal,
    /// Price 24h ago; the change baseline.
    #[serde(rename = "o", alias = "open", default)]
    pub open: Option<Decimal>,
    #[serde(rename = "h", alias = "high", default)]
    pub high: Decimal,
    #[serde(rename = "l", alias = "low", default)]
    pub low: Decimal,
    #[serde(rename = "b", alias = "baseVol", default)]
    pub base_vol: Decimal,
    #[serde(rename = "q", alias = "quoteVol", default)]
    pub quote_vol: Decimal,
}

impl StreamTicker {
    /// Builds a record, falling back to the frame symbol when the item has none.
    pub fn into_record(self, frame_symbol: Option<&str>) -> Option<TickerRecord> {
        let symbol = self
            .symbol
            .as_deref()
            .or(frame_symbol)
            .and_then(normalize_symbol)?;
        let change = change_percent(self.last_price, self.open);
        Some(TickerRecord {
            symbol,
            last_price: self.last_price,
            change_percent: change.unwrap_or(Decimal::ZERO),
            high_price: self.high,
            low_price: self.low,
            volume_base: self.base_vol,
            volume_quote: self.quote_vol,
            bid: None,
            ask: None,
            bid_volume: None,
            ask_volume: None,
            baseline_missing: change.is_none(),
        })
    }
}
