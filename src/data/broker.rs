//! Broker REST source: fetches bid/ask candles over HTTP.
//!
//! The broker speaks an OANDA-style v3 API: candles arrive as JSON with
//! string-encoded prices under `bid`/`ask` keys and RFC3339 timestamps.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{info, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::analysis::CandleList;
use crate::config::BrokerApiConfig;
use crate::data::{CandleRequest, FetchCandles};
use crate::domain::Candle;
use crate::errors::{Error, Result};

#[derive(Deserialize, Debug)]
struct RawOhlc {
    o: String,
    h: String,
    l: String,
    c: String,
}

#[derive(Deserialize, Debug)]
struct RawCandle {
    time: String,
    volume: u32,
    complete: bool,
    bid: RawOhlc,
    ask: RawOhlc,
}

#[derive(Deserialize, Debug)]
struct RawCandleResponse {
    candles: Vec<RawCandle>,
}

impl RawCandle {
    fn into_candle(self) -> Result<Candle> {
        let time = DateTime::parse_from_rfc3339(&self.time)
            .map_err(|e| Error::data(format!("Bad candle timestamp '{}': {}", self.time, e)))?
            .with_timezone(&Utc);
        Ok(Candle {
            time,
            open_bid: parse_price(&self.bid.o)?,
            high_bid: parse_price(&self.bid.h)?,
            low_bid: parse_price(&self.bid.l)?,
            close_bid: parse_price(&self.bid.c)?,
            open_ask: parse_price(&self.ask.o)?,
            high_ask: parse_price(&self.ask.h)?,
            low_ask: parse_price(&self.ask.l)?,
            close_ask: parse_price(&self.ask.c)?,
            volume: self.volume,
            complete: self.complete,
        })
    }
}

fn parse_price(raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|e| Error::data(format!("Bad candle price '{}': {}", raw, e)))
}

fn parse_response(request: &CandleRequest, raw: RawCandleResponse) -> Result<CandleList> {
    let candles = raw
        .candles
        .into_iter()
        .map(RawCandle::into_candle)
        .collect::<Result<Vec<_>>>()?;
    CandleList::new(request.instrument.clone(), request.granularity, candles)
}

/// Candle source backed by the broker's REST API.
pub struct BrokerRestSource {
    config: BrokerApiConfig,
    api_token: Option<String>,
    http: Client,
}

impl BrokerRestSource {
    pub fn new(config: BrokerApiConfig, api_token: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(BrokerRestSource {
            config,
            api_token,
            http,
        })
    }

    fn candles_url(&self, request: &CandleRequest) -> String {
        format!(
            "{}/v3/instruments/{}/candles",
            self.config.base_url, request.instrument
        )
    }

    fn query_params(&self, request: &CandleRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("price", "BA".to_string()),
            ("granularity", request.granularity.to_string()),
        ];
        if let Some(count) = request.count {
            params.push(("count", count.to_string()));
        }
        if let Some(from) = request.from {
            params.push(("from", from.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(to) = request.to {
            params.push(("to", to.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        params
    }

    /// One HTTP round trip. Transport problems map through the
    /// From<reqwest::Error> impl so timeouts come back retryable.
    async fn fetch_once(&self, request: &CandleRequest) -> Result<CandleList> {
        let url = self.candles_url(request);
        let mut http_request = self.http.get(&url).query(&self.query_params(request));
        if let Some(ref token) = self.api_token {
            http_request = http_request.bearer_auth(token);
        }

        let response = http_request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::External {
                message: format!("Broker returned HTTP {} for {}: {}", status, url, body),
                retryable: is_retryable_status(status),
            });
        }

        let raw: RawCandleResponse = response.json().await?;
        parse_response(request, raw)
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl FetchCandles for BrokerRestSource {
    fn signature(&self) -> &'static str {
        "Broker REST API"
    }

    async fn fetch_candles(&self, request: &CandleRequest) -> Result<CandleList> {
        request.validate()?;
        if let Some(count) = request.count {
            if count > self.config.max_candles_per_request {
                return Err(Error::config(format!(
                    "Requested {} candles, broker limit is {}",
                    count, self.config.max_candles_per_request
                )));
            }
        }

        let mut attempt = 0;
        loop {
            match self.fetch_once(request).await {
                Ok(candles) => {
                    info!(
                        "Fetched {} candles for {} {} from broker",
                        candles.len(),
                        request.instrument,
                        request.granularity
                    );
                    return Ok(candles);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let wait_ms = self.config.backoff_ms * 2u64.pow(attempt);
                    warn!(
                        "Broker fetch failed ({}), retry {}/{} in {}ms",
                        e,
                        attempt + 1,
                        self.config.max_retries,
                        wait_ms
                    );
                    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
