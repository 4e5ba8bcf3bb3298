//! Inbound frame decoding.

use serde::de::DeserializeOwned;
use tracing::debug;

use super::FeedEvent;
use crate::models::depth::StreamDepth;
use crate::models::ticker::{StreamTicker, TickerSet};
use crate::models::trade::StreamTrade;
use crate::models::{Channel, InboundFrame, OneOrMany, unix_millis};
use crate::{Result, TickerError};

/// Decodes one text frame.
///
/// Returns `Ok(None)` for control frames (`pong`, `connect`, acks), which
/// are never forwarded.
///
/// # Errors
///
/// Returns [`TickerError::Protocol`] for malformed JSON, frames on channels
/// outside the allow-list, and payloads that do not match their channel.
/// Callers log and drop these; they never end the session.
pub fn parse_frame(text: &str) -> Result<Option<FeedEvent>> {
    let frame: InboundFrame = serde_json::from_str(text)
        .map_err(|e| TickerError::Protocol(format!("malformed frame: {e}")))?;

    if let Some(op) = frame.op.as_deref() {
        match op {
            "pong" => debug!("Received pong"),
            "connect" => debug!("Connection acknowledged"),
            other => debug!(op = other, "Ignoring control frame"),
        }
        return Ok(None);
    }

    let Some(ch) = frame.ch.as_deref() else {
        return Err(TickerError::Protocol(format!("frame without op or ch: {text}")));
    };
    let Some(channel) = Channel::from_wire(ch) else {
        return Err(TickerError::Protocol(format!("unknown channel: {ch}")));
    };

    let symbol = frame.symbol.as_deref();
    let event = match channel {
        Channel::Ticker => {
            let records = items::<StreamTicker>(frame.data, ch)?
                .into_iter()
                .filter_map(|t| t.into_record(symbol))
                .collect();
            let ts = frame.ts.unwrap_or_else(unix_millis);
            FeedEvent::Ticker(TickerSet::new(records, Some(ts)))
        }
        Channel::Trade => FeedEvent::Trade(
            items::<StreamTrade>(frame.data, ch)?
                .into_iter()
                .filter_map(|t| t.into_trade(symbol))
                .collect(),
        ),
        Channel::DepthBook1 => FeedEvent::Depth(
            items::<StreamDepth>(frame.data, ch)?
                .into_iter()
                .filter_map(|d| d.into_update(symbol))
                .collect(),
        ),
    };
    Ok(Some(event))
}

fn items<T: DeserializeOwned>(data: serde_json::Value, ch: &str) -> Result<Vec<T>> {
    serde_json::from_value::<OneOrMany<T>>(data)
        .map(OneOrMany::into_vec)
        .map_err(|e| TickerError::Protocol(format!("invalid {ch} payload: {e}")))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn control_frames_are_swallowed() {
        assert!(parse_frame(r#"{"op":"pong","pong":1}"#).unwrap().is_none());
        assert!(parse_frame(r#"{"op":"connect","data":{"result":true}}"#).unwrap().is_none());
    }

    #[test]
    fn malformed_json_is_a_protocol_error() {
        let err = parse_frame("{not json").unwrap_err();
        assert!(matches!(err, TickerError::Protocol(_)));
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let err = parse_frame(r#"{"ch":"kline_1m","data":[]}"#).unwrap_err();
        assert!(err.to_string().contains("unknown channel"));
    }

    #[test]
    fn ticker_frame_with_array_payload() {
        let event = parse_frame(
            r#"{"ch":"ticker","ts":1700000000000,"data":[{"s":"BTCUSDT","la":"66000","o":"60000","h":"67000","l":"59000","b":"100","q":"6600000"}]}"#,
        )
        .unwrap()
        .unwrap();
        let FeedEvent::Ticker(set) = event else {
            panic!("expected ticker event");
        };
        assert_eq!(set.last_update(), Some(1_700_000_000_000));
        let record = set.get("BTCUSDT").unwrap();
        assert_eq!(record.last_price, dec!(66000));
        assert_eq!(record.change_percent, dec!(10.00));
    }

    #[test]
    fn trade_frame_takes_frame_symbol() {
        let event = parse_frame(
            r#"{"ch":"trade","symbol":"ETHUSDT","data":[{"t":"2024-01-01T00:00:00Z","p":"2500.5","v":"0.3","s":"buy"}]}"#,
        )
        .unwrap()
        .unwrap();
        let FeedEvent::Trade(trades) = event else {
            panic!("expected trade event");
        };
        assert_eq!(trades[0].symbol, "ETHUSDT");
        assert_eq!(trades[0].price, dec!(2500.5));
        assert_eq!(trades[0].side.as_deref(), Some("buy"));
    }

    #[test]
    fn depth_frame_with_object_payload() {
        let event = parse_frame(
            r#"{"ch":"depth_book1","symbol":"BTCUSDT","data":{"b":[["65999.5","1.2"]],"a":[["66000.5","0.8"]]}}"#,
        )
        .unwrap()
        .unwrap();
        let FeedEvent::Depth(updates) = event else {
            panic!("expected depth event");
        };
        assert_eq!(updates[0].bid, Some(dec!(65999.5)));
        assert_eq!(updates[0].ask_volume, Some(dec!(0.8)));
    }

    #[test]
    fn mismatched_payload_is_a_protocol_error() {
        let err = parse_frame(r#"{"ch":"ticker","data":[{"s":"BTCUSDT"}]}"#).unwrap_err();
        assert!(err.to_string().contains("invalid ticker payload"));
    }
}
