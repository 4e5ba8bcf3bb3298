//! Batch REST ticker fetching with a per-symbol 24h baseline lookup.
//!
//! One request fetches every configured symbol's current ticker; each
//! returned symbol then gets its own kline request for the close 24 hours
//! ago. Those lookups run concurrently and fail soft: a symbol whose
//! baseline cannot be fetched is still emitted, with a zero change.

use std::future::Future;
use std::time::Duration;

use futures_util::future::join_all;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::models::kline::KlineResponse;
use crate::models::ticker::{RestTicker, TickerRecord, TickerSet, TickersResponse};
use crate::models::{normalize_symbols, unix_millis};
use crate::{Result, TickerError};

/// Offset of the baseline candle from now.
pub const BASELINE_OFFSET: Duration = Duration::from_secs(24 * 60 * 60);

const TICKERS_PATH: &str = "/api/v1/futures/market/tickers";
const KLINE_PATH: &str = "/api/v1/futures/market/kline";

/// The two market-data endpoints the fetcher needs.
pub trait MarketApi: Send + Sync {
    /// Current tickers for the given (normalized) symbols.
    fn tickers(&self, symbols: &[String]) -> impl Future<Output = Result<Vec<RestTicker>>> + Send;

    /// Close of the most recent 1m candle ending at `end_time_ms`.
    fn reference_close(
        &self,
        symbol: &str,
        end_time_ms: i64,
    ) -> impl Future<Output = Result<Option<Decimal>>> + Send;
}

/// [`MarketApi`] backed by the Bitunix futures REST API.
#[derive(Debug, Clone)]
pub struct BitunixRestApi {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl BitunixRestApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl MarketApi for BitunixRestApi {
    async fn tickers(&self, symbols: &[String]) -> Result<Vec<RestTicker>> {
        let response = self
            .client
            .get(self.url(TICKERS_PATH))
            .query(&[("symbols", symbols.join(","))])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;

        let body: TickersResponse = response.json().await?;
        if body.code != 0 {
            return Err(TickerError::Fetch(format!(
                "tickers endpoint returned code {}: {}",
                body.code,
                body.msg.unwrap_or_default()
            )));
        }
        Ok(body.data)
    }

    async fn reference_close(&self, symbol: &str, end_time_ms: i64) -> Result<Option<Decimal>> {
        let end_time = end_time_ms.to_string();
        let response = self
            .client
            .get(self.url(KLINE_PATH))
            .query(&[
                ("symbol", symbol),
                ("interval", "1m"),
                ("limit", "1"),
                ("endTime", end_time.as_str()),
                ("type", "LAST_PRICE"),
            ])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;

        let body: KlineResponse = response.json().await?;
        Ok(body.first_close())
    }
}

/// Stateless batch fetcher.
///
/// Callers must not run two fetches for the same display concurrently; the
/// orchestrator keeps at most one in flight.
#[derive(Debug, Clone)]
pub struct RestTickerFetcher<A = BitunixRestApi> {
    api: A,
}

impl<A: MarketApi> RestTickerFetcher<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Fetches current tickers and their 24h change.
    ///
    /// Records come back in the order the tickers endpoint returned them.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::EmptySymbols`] for an empty (or all-blank)
    /// symbol list and [`TickerError::Fetch`] if the batch request fails.
    /// Baseline lookup failures never fail the fetch.
    pub async fn fetch<S: AsRef<str>>(&self, symbols: &[S]) -> Result<TickerSet> {
        let symbols = normalize_symbols(symbols);
        if symbols.is_empty() {
            return Err(TickerError::EmptySymbols);
        }

        let tickers = self.api.tickers(&symbols).await.map_err(|e| match e {
            TickerError::Fetch(_) => e,
            other => TickerError::Fetch(other.to_string()),
        })?;
        if tickers.len() < symbols.len() {
            debug!(
                requested = symbols.len(),
                returned = tickers.len(),
                "Tickers endpoint returned fewer symbols than requested"
            );
        }

        let end_time = unix_millis() - BASELINE_OFFSET.as_millis() as i64;
        let lookups = tickers
            .into_iter()
            .map(|ticker| self.with_baseline(ticker, end_time));
        let records: Vec<TickerRecord> = join_all(lookups).await.into_iter().flatten().collect();

        info!(count = records.len(), "Fetched tickers");
        Ok(TickerSet::new(records, Some(unix_millis())))
    }

    async fn with_baseline(&self, ticker: RestTicker, end_time: i64) -> Option<TickerRecord> {
        let close = match self.api.reference_close(&ticker.symbol, end_time).await {
            Ok(close) => close,
            Err(e) => {
                let err = TickerError::PartialData {
                    symbol: ticker.symbol.clone(),
                    reason: e.to_string(),
                };
                warn!(error = %err, "24h baseline lookup failed, reporting zero change");
                None
            }
        };
        ticker.into_record(close)
    }
}
