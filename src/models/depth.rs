//! Top-of-book (`depth_book1`) channel models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::normalize_symbol;

/// Payload item of the `depth_book1` WebSocket channel.
///
/// Each side is a list of `[price, qty]` pairs; only the first is used.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamDepth {
    #[serde(rename = "s", alias = "symbol", default)]
    pub symbol: Option<String>,
    #[serde(rename = "b", alias = "bids", default)]
    pub bids: Vec<[Decimal; 2]>,
    #[serde(rename = "a", alias = "asks", default)]
    pub asks: Vec<[Decimal; 2]>,
}

/// Best bid/ask for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthUpdate {
    pub symbol: String,
    pub bid: Option<Decimal>,
    pub bid_volume: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub ask_volume: Option<Decimal>,
}

impl StreamDepth {
    pub fn into_update(self, frame_symbol: Option<&str>) -> Option<DepthUpdate> {
        let symbol = self
            .symbol
            .as_deref()
            .or(frame_symbol)
            .and_then(normalize_symbol)?;
        let bid = self.bids.first();
        let ask = self.asks.first();
        Some(DepthUpdate {
            symbol,
            bid: bid.map(|level| level[0]),
            bid_volume: bid.map(|level| level[1]),
            ask: ask.map(|level| level[0]),
            ask_volume: ask.map(|level| level[1]),
        })
    }
}
