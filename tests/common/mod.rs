//! Shared test utilities: a recording display sink and a scripted market API.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bitunix_ticker::display::{DisplaySink, RenderFrame, ValuePatch};
use bitunix_ticker::models::ticker::RestTicker;
use bitunix_ticker::rest::MarketApi;
use bitunix_ticker::{Result, TickerError};
use rust_decimal::Decimal;

/// Bitunix public futures WebSocket endpoint.
pub const BITUNIX_WS_URL: &str = "wss://fapi.bitunix.com/public/";

/// Bitunix REST API base URL.
pub const BITUNIX_REST_URL: &str = "https://fapi.bitunix.com";

/// Everything a [`RecordingSink`] has seen, in call order.
#[derive(Debug, Default)]
pub struct Recorded {
    pub renders: Vec<RenderFrame>,
    pub patches: Vec<ValuePatch>,
}

/// Sink that records calls; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    log: Arc<Mutex<Recorded>>,
}

impl RecordingSink {
    pub fn renders(&self) -> Vec<RenderFrame> {
        self.log.lock().unwrap().renders.clone()
    }

    pub fn patches(&self) -> Vec<ValuePatch> {
        self.log.lock().unwrap().patches.clone()
    }
}

impl DisplaySink for RecordingSink {
    fn render(&mut self, frame: &RenderFrame) {
        self.log.lock().unwrap().renders.push(frame.clone());
    }

    fn patch(&mut self, patch: &ValuePatch) {
        self.log.lock().unwrap().patches.push(patch.clone());
    }
}

/// Market API answering from fixed data.
///
/// Symbols without an entry in `closes` fail their baseline lookup.
#[derive(Debug, Clone, Default)]
pub struct StubApi {
    pub tickers: Vec<RestTicker>,
    pub closes: HashMap<String, Decimal>,
    pub fail_tickers: bool,
    pub panic_tickers: bool,
    pub ticker_calls: Arc<AtomicUsize>,
}

impl StubApi {
    pub fn new(tickers: Vec<RestTicker>) -> Self {
        Self {
            tickers,
            ..Self::default()
        }
    }

    pub fn with_close(mut self, symbol: &str, close: Decimal) -> Self {
        self.closes.insert(symbol.to_string(), close);
        self
    }

    pub fn failing() -> Self {
        Self {
            fail_tickers: true,
            ..Self::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panic_tickers: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.ticker_calls.load(Ordering::SeqCst)
    }
}

impl MarketApi for StubApi {
    async fn tickers(&self, _symbols: &[String]) -> Result<Vec<RestTicker>> {
        self.ticker_calls.fetch_add(1, Ordering::SeqCst);
        assert!(!self.panic_tickers, "tickers endpoint stub panicked");
        if self.fail_tickers {
            return Err(TickerError::Fetch("connection refused".to_string()));
        }
        Ok(self.tickers.clone())
    }

    async fn reference_close(&self, symbol: &str, _end_time_ms: i64) -> Result<Option<Decimal>> {
        self.closes
            .get(symbol)
            .copied()
            .map(Some)
            .ok_or_else(|| TickerError::Fetch(format!("no kline for {symbol}")))
    }
}

/// Builds a REST ticker with only the price set.
pub fn rest_ticker(symbol: &str, last_price: Decimal) -> RestTicker {
    RestTicker {
        symbol: symbol.to_string(),
        last_price,
        high: last_price,
        low: last_price,
        base_vol: Decimal::ZERO,
        quote_vol: Decimal::ZERO,
    }
}

/// Ticker frame for BTCUSDT: last 66000 against an open of 60000.
pub const BTC_TICKER_FRAME: &str = r#"{"ch":"ticker","symbol":"BTCUSDT","ts":1700000000000,"data":{"s":"BTCUSDT","la":"66000","o":"60000","h":"67000","l":"59000","b":"100","q":"6600000"}}"#;

/// Later ticker frame for BTCUSDT: last 67200 against an open of 60000.
pub const BTC_TICKER_FRAME_HIGHER: &str = r#"{"ch":"ticker","symbol":"BTCUSDT","ts":1700000002000,"data":{"s":"BTCUSDT","la":"67200","o":"60000","h":"67200","l":"59000","b":"120","q":"8064000"}}"#;

/// Ticker frame for ETHUSDT: last 2500 against an open of 2500.
pub const ETH_TICKER_FRAME: &str = r#"{"ch":"ticker","symbol":"ETHUSDT","ts":1700000001000,"data":{"s":"ETHUSDT","la":"2500","o":"2500","h":"2600","l":"2400","b":"10","q":"25000"}}"#;

/// Accepts a single WebSocket connection on a random local port.
///
/// The server answers pings with pongs, pushes `frames` after the first
/// subscribe, and hangs up once it has seen both a subscribe and a ping.
/// The handle resolves to every JSON message the client sent.
pub async fn spawn_feed_server(
    frames: Vec<&'static str>,
) -> (String, tokio::task::JoinHandle<Vec<serde_json::Value>>) {
    spawn_delayed_feed_server(frames, std::time::Duration::ZERO).await
}

/// Like [`spawn_feed_server`], but waits `delay` after the subscribe
/// before pushing `frames`.
pub async fn spawn_delayed_feed_server(
    frames: Vec<&'static str>,
    delay: std::time::Duration,
) -> (String, tokio::task::JoinHandle<Vec<serde_json::Value>>) {
    use futures_util::{SinkExt, StreamExt};
    use tungstenite::Message;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let url = format!("ws://{}", listener.local_addr().expect("No local addr"));

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("Failed to accept");
        let mut ws = tokio_tungstenite::accept_async(stream)
            .await
            .expect("WebSocket handshake failed");

        let mut received = Vec::new();
        let (mut subscribed, mut pinged) = (false, false);
        while let Some(Ok(msg)) = ws.next().await {
            let Message::Text(text) = msg else { continue };
            let value: serde_json::Value =
                serde_json::from_str(&text).expect("Client sent invalid JSON");
            match value["op"].as_str() {
                Some("subscribe") if !subscribed => {
                    subscribed = true;
                    tokio::time::sleep(delay).await;
                    for frame in &frames {
                        ws.send(Message::Text((*frame).into())).await.expect("Send failed");
                    }
                }
                Some("ping") => {
                    pinged = true;
                    let pong = format!(r#"{{"op":"pong","pong":{}}}"#, value["ping"]);
                    ws.send(Message::Text(pong.into())).await.expect("Send failed");
                }
                _ => {}
            }
            received.push(value);
            if subscribed && pinged {
                break;
            }
        }
        let _ = ws.close(None).await;
        received
    });

    (url, handle)
}
