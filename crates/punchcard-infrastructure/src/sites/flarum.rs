use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

use punchcard_domain::checkin::{CheckinReport, Outcome};
use punchcard_domain::site::{
    CheckinSurface, RawResponse, SiteAdapter, SiteCredentials, SiteSession,
};
use punchcard_domain::EngineError;

use crate::http::HttpClient;

/// Flarum forums (蜂巢-style): the home page embeds a `csrfToken` and the
/// logged-in `userId`; check-in is a PATCH-over-POST to the users API.
pub struct FlarumAdapter {
    name: String,
    base_url: String,
    http: HttpClient,
}

fn csrf_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""csrfToken":"(.*?)""#).expect("static regex"))
}

fn user_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""userId":(\d+)"#).expect("static regex"))
}

fn money_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""money":\s*([\d.]+)"#).expect("static regex"))
}

fn streak_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""totalContinuousCheckIn":\s*(\d+)"#).expect("static regex"))
}

impl FlarumAdapter {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http: HttpClient) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http,
        }
    }
}

#[async_trait]
impl SiteAdapter for FlarumAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn authenticate(
        &self,
        credentials: &SiteCredentials,
    ) -> Result<SiteSession, EngineError> {
        if let Some(cookie) = credentials.cookie.as_deref().filter(|c| !c.is_empty()) {
            return Ok(SiteSession::new(cookie));
        }

        let (username, password) = match (&credentials.username, &credentials.password) {
            (Some(u), Some(p)) if !u.is_empty() => (u, p),
            _ => {
                return Err(EngineError::Config(
                    "No cookie or username/password configured".to_string(),
                ))
            }
        };

        let body = serde_json::json!({
            "identification": username,
            "password": password,
            "remember": true,
        });
        let login_url = format!("{}/login", self.base_url);
        let (response, cookie_header) = self.http.post_login(&login_url, &body).await?;

        if !(200..300).contains(&response.status) {
            return Err(EngineError::Auth(format!(
                "Login rejected with status {}",
                response.status
            )));
        }
        if cookie_header.is_empty() {
            return Err(EngineError::Auth(
                "Login succeeded but no session cookie was set".to_string(),
            ));
        }

        log::info!("[{}] Login exchange yielded a session cookie", self.name);

        let mut session = SiteSession::new(cookie_header);
        session.user_hint = Some(username.clone());
        Ok(session)
    }

    async fn fetch_checkin_surface(
        &self,
        session: &SiteSession,
    ) -> Result<CheckinSurface, EngineError> {
        let page = self
            .http
            .get_page(&self.base_url, Some(&session.cookie_header))
            .await?;

        if page.status != 200 {
            return Err(EngineError::Protocol(format!(
                "Home page returned status {}",
                page.status
            )));
        }

        let token = csrf_token_re()
            .captures(&page.body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| EngineError::Protocol("csrfToken not found in page".to_string()))?;

        let user_id = user_id_re()
            .captures(&page.body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|id| id != "0")
            .ok_or_else(|| {
                EngineError::Protocol("userId missing or zero; cookie likely expired".to_string())
            })?;

        let balance_before = money_re()
            .captures(&page.body)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok());
        let streak_before = streak_re()
            .captures(&page.body)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok());

        log::info!(
            "[{}] Surface ready: user {}, balance before {:?}, streak before {:?}",
            self.name,
            user_id,
            balance_before,
            streak_before
        );

        Ok(CheckinSurface {
            anti_forgery_token: token,
            user_id,
            balance_before,
            streak_before,
        })
    }

    async fn submit_checkin(
        &self,
        session: &SiteSession,
        surface: &CheckinSurface,
    ) -> Result<RawResponse, EngineError> {
        let url = format!("{}/api/users/{}", self.base_url, surface.user_id);

        // Flarum's REST layer expects a PATCH; the web client tunnels it
        // through POST with a method-override header.
        let body = serde_json::json!({
            "data": {
                "type": "users",
                "attributes": {
                    "canCheckin": false,
                    "totalContinuousCheckIn": 2,
                },
                "id": surface.user_id,
            }
        });
        let headers = [
            ("X-Csrf-Token", surface.anti_forgery_token.clone()),
            ("X-Http-Method-Override", "PATCH".to_string()),
        ];

        let response = self
            .http
            .post_json(&url, Some(&session.cookie_header), &headers, &body)
            .await?;

        if response.status != 200 {
            return Err(EngineError::Protocol(format!(
                "Check-in request returned status {}",
                response.status
            )));
        }

        Ok(response)
    }

    fn interpret(
        &self,
        raw: &RawResponse,
        previous_balance: Option<f64>,
    ) -> Result<CheckinReport, EngineError> {
        let data: serde_json::Value = serde_json::from_str(&raw.body)
            .map_err(|e| EngineError::Protocol(format!("Check-in response is not JSON: {}", e)))?;

        let attributes = &data["data"]["attributes"];
        let money = attributes["money"].as_f64();
        let streak = attributes["totalContinuousCheckIn"]
            .as_u64()
            .map(|v| v as u32);
        let reward = attributes["lastCheckinMoney"].as_f64().filter(|r| *r > 0.0);

        // The balance delta is the reliable signal; the canCheckin flag in
        // the response is known to lag on some deployments.
        let succeeded = match (previous_balance, money) {
            (Some(before), Some(after)) => after > before,
            _ => raw.body.contains(r#""canCheckin":true"#),
        };

        let report = if succeeded {
            let message = match reward {
                Some(r) => format!("Got {} pollen for today's check-in", r),
                None => "Checked in and claimed today's reward".to_string(),
            };
            CheckinReport::new(Outcome::Success, message).with_numbers(reward, money, streak)
        } else {
            CheckinReport::new(Outcome::AlreadyDone, "Today's reward was already claimed")
                .with_numbers(None, money, streak)
        };

        Ok(report)
    }
}
