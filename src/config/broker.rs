//! Broker REST API configuration constants and types.

/// Runtime configuration for the broker HTTP client.
#[derive(Debug, Clone)]
pub struct BrokerApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub max_candles_per_request: usize,
}

impl Default for BrokerApiConfig {
    fn default() -> Self {
        Self {
            base_url: BROKER.client.base_url.to_string(),
            timeout_ms: BROKER.client.timeout_ms,
            max_retries: BROKER.client.max_retries,
            backoff_ms: BROKER.client.backoff_ms,
            max_candles_per_request: BROKER.limits.max_candles_per_request,
        }
    }
}

/// Configuration for REST API limits
pub struct RestLimits {
    /// Maximum number of candles the broker returns in a single request
    pub max_candles_per_request: usize,
    /// Maximum age of cached candle data (seconds)
    pub candle_acceptable_age_sec: i64,
}

/// Default values for the Rest Client
pub struct ClientDefaults {
    pub base_url: &'static str,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
}

/// The Master Configuration Struct
pub struct BrokerConfig {
    pub limits: RestLimits,
    pub client: ClientDefaults,
}

pub const BROKER: BrokerConfig = BrokerConfig {
    limits: RestLimits {
        max_candles_per_request: 5000,
        // 24 hours (60 * 60 * 24)
        candle_acceptable_age_sec: 86_400,
    },
    client: ClientDefaults {
        base_url: "https://api-fxpractice.oanda.com",
        timeout_ms: 5000,
        max_retries: 5,
        // Doubles on each retry: 1s, 2s, 4s, ...
        backoff_ms: 1000,
    },
};
