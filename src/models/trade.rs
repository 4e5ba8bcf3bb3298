//! Trade channel models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::normalize_symbol;

/// Payload item of the `trade` WebSocket channel.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamTrade {
    #[serde(rename = "t", alias = "time", default)]
    pub time: Option<String>,
    #[serde(rename = "p", alias = "price")]
    pub price: Decimal,
    #[serde(rename = "v", alias = "volume")]
    pub volume: Decimal,
    /// Taker side: `"buy"` or `"sell"`.
    #[serde(rename = "s", alias = "side", default)]
    pub side: Option<String>,
}

/// A single executed trade, tagged with its symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeData {
    pub symbol: String,
    pub price: Decimal,
    pub volume: Decimal,
    pub side: Option<String>,
    pub time: Option<String>,
}

impl StreamTrade {
    /// Trade items never carry a symbol; it comes from the frame.
    pub fn into_trade(self, frame_symbol: Option<&str>) -> Option<TradeData> {
        Some(TradeData {
            symbol: frame_symbol.and_then(normalize_symbol)?,
            price: self.price,
            volume: self.volume,
            side: self.side,
            time: self.time,
        })
    }
}
