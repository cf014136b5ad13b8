use async_trait::async_trait;

use punchcard_domain::checkin::{CheckinReport, Outcome};
use punchcard_domain::site::{
    CheckinSurface, RawResponse, SiteAdapter, SiteCredentials, SiteSession,
};
use punchcard_domain::EngineError;

use crate::http::HttpClient;

// Fixed token the upstream web client sends with every check-in request.
const CHECKIN_TOKEN: &str = "glados.one";

/// Plain JSON check-in APIs (GlaDOS-style): cookie auth, a status endpoint
/// for the account, a checkin endpoint that answers `code`/`points`.
pub struct JsonApiAdapter {
    name: String,
    base_url: String,
    http: HttpClient,
}

impl JsonApiAdapter {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http: HttpClient) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http,
        }
    }

    fn status_url(&self) -> String {
        format!("{}/api/user/status", self.base_url)
    }

    fn checkin_url(&self) -> String {
        format!("{}/api/user/checkin", self.base_url)
    }
}

/// Numbers in these APIs arrive as either JSON numbers or strings.
fn loose_f64(value: &serde_json::Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

#[async_trait]
impl SiteAdapter for JsonApiAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn authenticate(
        &self,
        credentials: &SiteCredentials,
    ) -> Result<SiteSession, EngineError> {
        let cookie = credentials
            .cookie
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| EngineError::Config("No cookie configured".to_string()))?;

        Ok(SiteSession::new(cookie))
    }

    async fn fetch_checkin_surface(
        &self,
        session: &SiteSession,
    ) -> Result<CheckinSurface, EngineError> {
        let response = self
            .http
            .get_page(&self.status_url(), Some(&session.cookie_header))
            .await?;

        if response.status == 401 || response.status == 403 {
            return Err(EngineError::Auth(format!(
                "Status endpoint rejected the cookie (status {})",
                response.status
            )));
        }
        if response.status != 200 {
            return Err(EngineError::Protocol(format!(
                "Status endpoint returned status {}",
                response.status
            )));
        }

        let data: serde_json::Value = serde_json::from_str(&response.body)
            .map_err(|e| EngineError::Protocol(format!("Status response is not JSON: {}", e)))?;

        if data["code"].as_i64() != Some(0) {
            return Err(EngineError::Auth(format!(
                "Status endpoint answered code {:?}; cookie likely expired",
                data["code"]
            )));
        }

        let user_id = data["data"]["email"]
            .as_str()
            .map(str::to_string)
            .or_else(|| data["data"]["id"].as_i64().map(|id| id.to_string()))
            .ok_or_else(|| {
                EngineError::Protocol("No user identifier in status response".to_string())
            })?;

        Ok(CheckinSurface {
            anti_forgery_token: CHECKIN_TOKEN.to_string(),
            user_id,
            balance_before: None,
            streak_before: None,
        })
    }

    async fn submit_checkin(
        &self,
        session: &SiteSession,
        surface: &CheckinSurface,
    ) -> Result<RawResponse, EngineError> {
        let body = serde_json::json!({ "token": surface.anti_forgery_token });

        let response = self
            .http
            .post_json(&self.checkin_url(), Some(&session.cookie_header), &[], &body)
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

        let code = data["code"].as_i64();
        let message = data["message"].as_str().unwrap_or("").to_string();
        let points = loose_f64(&data["points"]).unwrap_or(0.0);
        let balance = loose_f64(&data["list"][0]["balance"]);

        // Balance delta first; the code field is the fallback only.
        let outcome = match (previous_balance, balance) {
            (Some(before), Some(after)) => {
                if after > before {
                    Outcome::Success
                } else {
                    Outcome::AlreadyDone
                }
            }
            // code 0 with zero points is a refusal, not a repeat; only
            // code 1 means the day was already claimed.
            _ => match code {
                Some(0) if points > 0.0 => Outcome::Success,
                Some(1) => Outcome::AlreadyDone,
                _ => Outcome::Failed,
            },
        };

        let report = match outcome {
            Outcome::Success => CheckinReport::new(
                Outcome::Success,
                format!("Checked in, got {} points", points),
            )
            .with_numbers(Some(points), balance, None),
            Outcome::AlreadyDone => {
                CheckinReport::new(Outcome::AlreadyDone, "Already checked in, come back tomorrow")
                    .with_numbers(None, balance, None)
            }
            Outcome::Failed => CheckinReport::new(
                Outcome::Failed,
                if message.is_empty() {
                    format!("Check-in refused (code {:?})", code)
                } else {
                    message
                },
            ),
        };

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> JsonApiAdapter {
        JsonApiAdapter::new(
            "glados",
            "https://glados.example",
            HttpClient::new().unwrap(),
        )
    }

    fn response(body: &str) -> RawResponse {
        RawResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    #[test]
    fn fresh_checkin_is_a_success() {
        let body = r#"{"code":0,"message":"Checkin! Got 1 Points.","points":1,
            "list":[{"user_id":7,"balance":"42.0","time":1717000000000}]}"#;
        let report = adapter().interpret(&response(body), None).unwrap();
        assert_eq!(report.outcome, Outcome::Success);
        assert_eq!(report.reward, Some(1.0));
        assert_eq!(report.balance, Some(42.0));
    }

    #[test]
    fn code_one_means_already_done() {
        let body = r#"{"code":1,"message":"Checkin Repeats!","points":0,
            "list":[{"user_id":7,"balance":"42.0","time":1717000000000}]}"#;
        let report = adapter().interpret(&response(body), None).unwrap();
        assert_eq!(report.outcome, Outcome::AlreadyDone);
    }

    #[test]
    fn code_zero_without_points_is_a_failure() {
        // Some deployments answer code 0 with zero points when the
        // check-in was refused; that is not an already-done day.
        let body = r#"{"code":0,"message":"Checkin Error","points":0,"list":[]}"#;
        let report = adapter().interpret(&response(body), None).unwrap();
        assert_eq!(report.outcome, Outcome::Failed);
        assert_eq!(report.message, "Checkin Error");
    }

    #[test]
    fn balance_delta_overrides_the_code() {
        // Same "repeat" code but the balance moved: trust the numbers.
        let body = r#"{"code":1,"message":"Checkin Repeats!","points":1,
            "list":[{"user_id":7,"balance":"43.0"}]}"#;
        let report = adapter().interpret(&response(body), Some(42.0)).unwrap();
        assert_eq!(report.outcome, Outcome::Success);
    }

    #[test]
    fn unknown_code_is_a_failed_report() {
        let body = r#"{"code":-2,"message":"Please Login","points":0,"list":[]}"#;
        let report = adapter().interpret(&response(body), None).unwrap();
        assert_eq!(report.outcome, Outcome::Failed);
        assert_eq!(report.message, "Please Login");
    }

    #[test]
    fn string_and_number_balances_both_parse() {
        assert_eq!(loose_f64(&serde_json::json!("12.5")), Some(12.5));
        assert_eq!(loose_f64(&serde_json::json!(12.5)), Some(12.5));
        assert_eq!(loose_f64(&serde_json::json!(null)), None);
    }
}
