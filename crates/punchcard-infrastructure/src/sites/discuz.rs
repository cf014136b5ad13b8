use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

use punchcard_domain::checkin::{CheckinReport, Outcome};
use punchcard_domain::site::{
    CheckinSurface, RawResponse, SiteAdapter, SiteCredentials, SiteSession,
};
use punchcard_domain::EngineError;

use crate::http::HttpClient;

/// Discuz forums running the dsu_paulsign sign plugin (阡陌居, 绿联
/// and friends). Cookie-only auth; the sign form wants a `formhash`.
pub struct DiscuzAdapter {
    name: String,
    base_url: String,
    http: HttpClient,
}

fn formhash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"name="formhash" value="([^"]+)""#).expect("static regex"))
}

fn uid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"home\.php\?mod=space&(?:amp;)?uid=(\d+)"#).expect("static regex")
    })
}

fn reward_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "恭喜你签到成功!您获得随机奖励 铜币 2" and close variants
    RE.get_or_init(|| Regex::new(r"奖励[^\d]*(\d+)").expect("static regex"))
}

impl DiscuzAdapter {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http: HttpClient) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http,
        }
    }

    fn sign_page_url(&self) -> String {
        format!("{}/plugin.php?id=dsu_paulsign:sign", self.base_url)
    }

    fn sign_submit_url(&self) -> String {
        format!(
            "{}/plugin.php?id=dsu_paulsign%3Asign&operation=qiandao&infloat=1&inajax=1",
            self.base_url
        )
    }
}

#[async_trait]
impl SiteAdapter for DiscuzAdapter {
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

        // A logged-in Discuz page always carries the logout link; guests
        // never see it.
        let page = self.http.get_page(&self.base_url, Some(cookie)).await?;
        if page.status != 200 {
            return Err(EngineError::Network(format!(
                "Forum home returned status {}",
                page.status
            )));
        }
        if !page.body.contains("action=logout") {
            return Err(EngineError::Auth(
                "Cookie is invalid or expired".to_string(),
            ));
        }

        Ok(SiteSession::new(cookie))
    }

    async fn fetch_checkin_surface(
        &self,
        session: &SiteSession,
    ) -> Result<CheckinSurface, EngineError> {
        let page = self
            .http
            .get_page(&self.sign_page_url(), Some(&session.cookie_header))
            .await?;

        if page.status != 200 {
            return Err(EngineError::Protocol(format!(
                "Sign page returned status {}",
                page.status
            )));
        }

        let formhash = formhash_re()
            .captures(&page.body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| EngineError::Protocol("formhash not found on sign page".to_string()))?;

        let user_id = uid_re()
            .captures(&page.body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| EngineError::Protocol("uid not found on sign page".to_string()))?;

        log::info!(
            "[{}] Surface ready: uid {}, formhash {}...",
            self.name,
            user_id,
            &formhash[..formhash.len().min(6)]
        );

        Ok(CheckinSurface {
            anti_forgery_token: formhash,
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
        let form = [
            ("formhash", surface.anti_forgery_token.clone()),
            ("qdxq", "kx".to_string()),
            ("qdmode", "1".to_string()),
            ("todaysay", String::new()),
            ("fastreply", "0".to_string()),
        ];

        let response = self
            .http
            .post_form(
                &self.sign_submit_url(),
                Some(&session.cookie_header),
                Some(&self.sign_page_url()),
                &form,
            )
            .await?;

        if response.status != 200 {
            return Err(EngineError::Protocol(format!(
                "Sign request returned status {}",
                response.status
            )));
        }

        Ok(response)
    }

    fn interpret(
        &self,
        raw: &RawResponse,
        _previous_balance: Option<f64>,
    ) -> Result<CheckinReport, EngineError> {
        // The inajax endpoint answers with a CDATA blob of localized
        // markup; substrings are all there is to go on here.
        let body = &raw.body;

        if body.contains("签到成功") || body.contains("恭喜") {
            let reward = reward_re()
                .captures(body)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok());
            let message = match reward {
                Some(r) => format!("Signed in, random reward +{}", r),
                None => "Signed in successfully".to_string(),
            };
            return Ok(CheckinReport::new(Outcome::Success, message).with_numbers(
                reward,
                None,
                None,
            ));
        }

        if body.contains("已经签到") || body.contains("已签到") || body.contains("今日已签") {
            return Ok(CheckinReport::new(
                Outcome::AlreadyDone,
                "Already signed in today",
            ));
        }

        if body.contains("需要先登录") || body.contains("请先登录") {
            return Err(EngineError::Auth("Session rejected by the forum".to_string()));
        }

        let snippet: String = body.chars().take(120).collect();
        Err(EngineError::Protocol(format!(
            "Unrecognized sign response: {}",
            snippet
        )))
    }
}
