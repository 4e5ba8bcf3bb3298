//! Kline (candlestick) REST models, used only for the 24h reference close.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Response of `GET /api/v1/futures/market/kline`.
#[derive(Debug, Deserialize)]
pub struct KlineResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub data: Vec<KlineData>,
}

/// A single candle; only the close is consumed.
#[derive(Debug, Deserialize)]
pub struct KlineData {
    #[serde(default)]
    pub close: Option<Decimal>,
}

impl KlineResponse {
    /// Close of the first (most recent) candle, if any.
    pub fn first_close(&self) -> Option<Decimal> {
        self.data.first().and_then(|k| k.close)
    }
}
