use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checkin::CheckinReport;
use crate::shared::EngineError;

/// Operator-supplied credentials for one site.
///
/// Cookie-based sites fill `cookie`; login-based sites fill
/// `username`/`password` and obtain the session cookie per run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteCredentials {
    pub cookie: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SiteCredentials {
    pub fn from_cookie(cookie: impl Into<String>) -> Self {
        Self {
            cookie: Some(cookie.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cookie.as_deref().map_or(true, str::is_empty)
            && self.username.as_deref().map_or(true, str::is_empty)
    }
}

/// Ephemeral authenticated session. Obtained fresh per run, never persisted.
#[derive(Debug, Clone)]
pub struct SiteSession {
    /// Value sent as the `Cookie` header on follow-up requests.
    pub cookie_header: String,
    /// Site-side account hint (username, email) when authentication
    /// surfaces one; display only.
    pub user_hint: Option<String>,
}

impl SiteSession {
    pub fn new(cookie_header: impl Into<String>) -> Self {
        Self {
            cookie_header: cookie_header.into(),
            user_hint: None,
        }
    }
}

/// What a site exposes before the check-in is submitted: the anti-forgery
/// token, the user identifier, and (when the page carries them) the
/// pre-check-in balance/streak used for delta interpretation.
#[derive(Debug, Clone)]
pub struct CheckinSurface {
    pub anti_forgery_token: String,
    pub user_id: String,
    pub balance_before: Option<f64>,
    pub streak_before: Option<u32>,
}

/// Raw check-in response, handed to `interpret` untouched.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Last-known profile numbers, persisted between runs. The stored balance
/// is the authoritative "before" value for the next run's interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteProfile {
    pub balance: Option<f64>,
    pub streak: Option<u32>,
    pub fetched_at: DateTime<Utc>,
}

impl SiteProfile {
    pub fn from_report(report: &CheckinReport, fetched_at: DateTime<Utc>) -> Self {
        Self {
            balance: report.balance,
            streak: report.streak,
            fetched_at,
        }
    }
}

/// Everything the engine needs from a concrete site.
///
/// One implementation per site family; all markup/JSON volatility stays
/// behind this seam.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Establish an authenticated session from the supplied credentials.
    async fn authenticate(
        &self,
        credentials: &SiteCredentials,
    ) -> Result<SiteSession, EngineError>;

    /// Fetch the check-in page/endpoint and extract the anti-forgery token
    /// and user identifier.
    async fn fetch_checkin_surface(
        &self,
        session: &SiteSession,
    ) -> Result<CheckinSurface, EngineError>;

    /// Submit the check-in request with the extracted token.
    async fn submit_checkin(
        &self,
        session: &SiteSession,
        surface: &CheckinSurface,
    ) -> Result<RawResponse, EngineError>;

    /// Decide Success vs AlreadyDone vs Failed from the raw response.
    /// A known `previous_balance` makes the balance delta authoritative;
    /// response flags are only the fallback.
    fn interpret(
        &self,
        raw: &RawResponse,
        previous_balance: Option<f64>,
    ) -> Result<CheckinReport, EngineError>;
}
