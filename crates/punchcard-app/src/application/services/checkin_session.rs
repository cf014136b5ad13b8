use std::sync::Arc;
use tracing::{info, warn};

use punchcard_domain::checkin::CheckinReport;
use punchcard_domain::site::{RawResponse, SiteAdapter, SiteCredentials, SiteSession};
use punchcard_domain::EngineError;
use punchcard_infrastructure::config::TimeoutConfig;

/// How often the login/session exchange is verified before giving up.
const AUTH_VERIFY_ATTEMPTS: u32 = 3;
/// Within-attempt retries of the fetch-and-submit sequence on transient
/// failures, before the error escalates to the outer retry budget.
const INNER_ATTEMPTS: u32 = 3;

/// Runs the network sequence of one check-in attempt against a site
/// adapter: authenticate, fetch the anti-forgery surface, submit,
/// interpret. Holds no cross-run state; the orchestrator owns the
/// in-flight guard and the outer retry budget.
pub struct CheckinSession {
    adapter: Arc<dyn SiteAdapter>,
    credentials: SiteCredentials,
}

impl CheckinSession {
    pub fn new(adapter: Arc<dyn SiteAdapter>, credentials: SiteCredentials) -> Self {
        Self {
            adapter,
            credentials,
        }
    }

    pub fn site_name(&self) -> &str {
        self.adapter.name()
    }

    /// One full check-in attempt. `previous_balance` is the last balance
    /// the engine saw for this account; when present it makes the
    /// success/already-done interpretation authoritative.
    pub async fn run(
        &self,
        previous_balance: Option<f64>,
    ) -> Result<CheckinReport, EngineError> {
        if self.credentials.is_empty() {
            return Err(EngineError::Config(
                "No credentials configured for this site".to_string(),
            ));
        }

        let session = self.authenticate_verified().await?;
        let (surface_balance, raw) = self.fetch_and_submit(&session).await?;

        // The balance scraped off the check-in page right before the
        // submit beats the stored profile value; both beat flags.
        let before = surface_balance.or(previous_balance);
        self.adapter.interpret(&raw, before)
    }

    /// Authenticate with a bounded verification loop: transient failures
    /// get another chance after a short delay, configuration problems
    /// abort immediately.
    async fn authenticate_verified(&self) -> Result<SiteSession, EngineError> {
        let delay = TimeoutConfig::global().auth_verify_delay;
        let mut last_error = None;

        for attempt in 1..=AUTH_VERIFY_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(delay).await;
            }

            match self.adapter.authenticate(&self.credentials).await {
                Ok(session) => {
                    if attempt > 1 {
                        info!(
                            "[{}] Session established on attempt {}",
                            self.site_name(),
                            attempt
                        );
                    }
                    return Ok(session);
                }
                Err(e @ EngineError::Config(_)) => return Err(e),
                Err(e) => {
                    warn!(
                        "[{}] Session attempt {}/{} failed: {}",
                        self.site_name(),
                        attempt,
                        AUTH_VERIFY_ATTEMPTS,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(EngineError::Auth(format!(
            "No valid session after {} attempts: {}",
            AUTH_VERIFY_ATTEMPTS,
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string())
        )))
    }

    /// Fetch the check-in surface and submit, retrying the pair on
    /// transient errors. Returns the pre-check-in balance from the
    /// surface (when the page carries one) and the raw submit response.
    async fn fetch_and_submit(
        &self,
        session: &SiteSession,
    ) -> Result<(Option<f64>, RawResponse), EngineError> {
        let delay = TimeoutConfig::global().inner_retry_delay;
        let mut last_error = None;

        for attempt in 1..=INNER_ATTEMPTS {
            if attempt > 1 {
                info!(
                    "[{}] Retrying check-in sequence ({}/{})",
                    self.site_name(),
                    attempt,
                    INNER_ATTEMPTS
                );
                tokio::time::sleep(delay).await;
            }

            let result = async {
                let surface = self.adapter.fetch_checkin_surface(session).await?;
                let raw = self.adapter.submit_checkin(session, &surface).await?;
                Ok::<_, EngineError>((surface.balance_before, raw))
            }
            .await;

            match result {
                Ok(ok) => return Ok(ok),
                Err(e) if e.is_transient() && attempt < INNER_ATTEMPTS => {
                    warn!(
                        "[{}] Transient failure on attempt {}: {}",
                        self.site_name(),
                        attempt,
                        e
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        // Loop always returns or stores an error before falling through.
        Err(last_error.unwrap_or_else(|| {
            EngineError::Network(format!(
                "Check-in sequence failed after {} attempts",
                INNER_ATTEMPTS
            ))
        }))
    }
}
