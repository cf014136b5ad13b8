use std::time::Duration;

/// Timeout and delay durations used across the engine
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// HTTP request timeout
    pub http_request: Duration,

    /// Delay between session verification attempts
    pub auth_verify_delay: Duration,

    /// Delay between within-attempt retries of the check-in sequence
    pub inner_retry_delay: Duration,

    /// Database query timeout
    pub db_query: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            http_request: Duration::from_secs(30),
            auth_verify_delay: Duration::from_secs(3),
            inner_retry_delay: Duration::from_secs(3),
            db_query: Duration::from_secs(10),
        }
    }
}

impl TimeoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Global timeout configuration
    pub fn global() -> &'static Self {
        &GLOBAL_TIMEOUT_CONFIG
    }
}

static GLOBAL_TIMEOUT_CONFIG: TimeoutConfig = TimeoutConfig {
    http_request: Duration::from_secs(30),
    auth_verify_delay: Duration::from_secs(3),
    inner_retry_delay: Duration::from_secs(3),
    db_query: Duration::from_secs(10),
};
