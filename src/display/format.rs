//! Value formatting shared by the full-render and in-place patch paths.
//!
//! Both paths build a [`FormattedTicker`] through [`FormattedTicker::new`],
//! so a price can never be shown with different precision depending on
//! which path drew it.

use chrono::{DateTime, Local};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::models::ticker::TickerRecord;

/// How a record without a usable 24h baseline shows its change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingBaseline {
    /// Show `(0.00%)` in the neutral color.
    #[default]
    Zero,
    /// Show `(n/a)` in the neutral color.
    Unknown,
}

/// Color classification derived from the change percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorClass {
    Positive,
    Negative,
    Neutral,
}

impl ColorClass {
    pub fn classify(change_percent: Decimal) -> Self {
        if change_percent > Decimal::ZERO {
            ColorClass::Positive
        } else if change_percent < Decimal::ZERO {
            ColorClass::Negative
        } else {
            ColorClass::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorClass::Positive => "positive",
            ColorClass::Negative => "negative",
            ColorClass::Neutral => "neutral",
        }
    }
}

/// Decimal places for a price: <1 → 6, <10 → 4, <100 → 3, otherwise 2.
pub fn price_decimals(price: Decimal) -> u32 {
    if price < Decimal::ONE {
        6
    } else if price < Decimal::TEN {
        4
    } else if price < Decimal::ONE_HUNDRED {
        3
    } else {
        2
    }
}

/// Formats a price with magnitude-dependent precision.
pub fn format_price(price: Decimal) -> String {
    let dp = price_decimals(price);
    fixed(price, dp)
}

/// Formats a change percentage as `(x.xx%)`.
pub fn format_change(change_percent: Decimal) -> String {
    format!("({}%)", fixed(change_percent, 2))
}

/// Local wall-clock `HH:MM:SS` for a Unix-millisecond timestamp, `None` if
/// the timestamp is out of range.
pub fn format_clock(unix_ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(unix_ms)
        .map(|utc| utc.with_timezone(&Local).format("%H:%M:%S").to_string())
}

fn fixed(value: Decimal, dp: u32) -> String {
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        // drop the sign of a negative zero
        rounded = Decimal::ZERO;
    }
    format!("{:.*}", dp as usize, rounded)
}

/// Display-ready values for one ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedTicker {
    pub symbol: String,
    pub display_symbol: String,
    pub price_text: String,
    pub change_text: String,
    pub class: ColorClass,
    pub high_text: String,
    pub low_text: String,
    pub bid_text: Option<String>,
    pub ask_text: Option<String>,
}

impl FormattedTicker {
    pub fn new(record: &TickerRecord, missing_baseline: MissingBaseline) -> Self {
        let unknown = record.baseline_missing && missing_baseline == MissingBaseline::Unknown;
        let (change_text, class) = if unknown {
            ("(n/a)".to_string(), ColorClass::Neutral)
        } else {
            (
                format_change(record.change_percent),
                ColorClass::classify(record.change_percent),
            )
        };
        Self {
            symbol: record.symbol.clone(),
            display_symbol: record.display_symbol().to_string(),
            price_text: format_price(record.last_price),
            change_text,
            class,
            high_text: format_price(record.high_price),
            low_text: format_price(record.low_price),
            bid_text: record.bid.map(format_price),
            ask_text: record.ask.map(format_price),
        }
    }
}
