use reqwest::{header, Client};

use punchcard_domain::site::RawResponse;
use punchcard_domain::EngineError;

use crate::config::TimeoutConfig;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

/// Thin reqwest wrapper shared by all site adapters.
///
/// Cookies are passed explicitly per request; sites hand sessions around
/// as opaque `Cookie` header strings. Status interpretation is left to
/// the adapters, transport failures surface as `EngineError::Network`.
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, EngineError> {
        Self::with_proxy(None)
    }

    pub fn with_proxy(proxy_url: Option<String>) -> Result<Self, EngineError> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .gzip(true)
            .timeout(TimeoutConfig::global().http_request);

        if let Some(url) = proxy_url.filter(|u| !u.is_empty()) {
            let proxy = reqwest::Proxy::all(&url)
                .map_err(|e| EngineError::Config(format!("Invalid proxy URL {}: {}", url, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| EngineError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// GET a page, following redirects. Browser-like Accept headers so
    /// forum software serves the full markup.
    pub async fn get_page(
        &self,
        url: &str,
        cookie: Option<&str>,
    ) -> Result<RawResponse, EngineError> {
        let mut request = self
            .client
            .get(url)
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(header::ACCEPT_LANGUAGE, "zh-CN,zh;q=0.9,en;q=0.8");

        if let Some(cookie) = cookie.filter(|c| !c.is_empty()) {
            request = request.header(header::COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Network(format!("GET {} failed: {}", url, e)))?;

        Self::into_raw(url, response).await
    }

    /// POST a form body, as Discuz-style sign plugins expect.
    pub async fn post_form(
        &self,
        url: &str,
        cookie: Option<&str>,
        referer: Option<&str>,
        form: &[(&str, String)],
    ) -> Result<RawResponse, EngineError> {
        let mut request = self.client.post(url).form(form);

        if let Some(cookie) = cookie.filter(|c| !c.is_empty()) {
            request = request.header(header::COOKIE, cookie);
        }
        if let Some(referer) = referer {
            request = request.header(header::REFERER, referer);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Network(format!("POST {} failed: {}", url, e)))?;

        Self::into_raw(url, response).await
    }

    /// POST a JSON body with per-call extra headers (anti-forgery token,
    /// method override and the like).
    pub async fn post_json(
        &self,
        url: &str,
        cookie: Option<&str>,
        extra_headers: &[(&str, String)],
        body: &serde_json::Value,
    ) -> Result<RawResponse, EngineError> {
        let origin = extract_origin(url)?;

        let mut request = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/json, text/plain, */*")
            .header(header::ORIGIN, origin.clone())
            .header(header::REFERER, format!("{}/", origin))
            .json(body);

        if let Some(cookie) = cookie.filter(|c| !c.is_empty()) {
            request = request.header(header::COOKIE, cookie);
        }
        for (name, value) in extra_headers {
            request = request.header(*name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Network(format!("POST {} failed: {}", url, e)))?;

        Self::into_raw(url, response).await
    }

    /// POST a login exchange and capture the session cookies it sets.
    /// Returns the response plus a ready-to-send `Cookie` header value.
    pub async fn post_login(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<(RawResponse, String), EngineError> {
        let response = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/json, text/plain, */*")
            .json(body)
            .send()
            .await
            .map_err(|e| EngineError::Network(format!("POST {} failed: {}", url, e)))?;

        let cookie_header = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .collect::<Vec<_>>()
            .join("; ");

        let raw = Self::into_raw(url, response).await?;
        Ok((raw, cookie_header))
    }

    async fn into_raw(
        url: &str,
        response: reqwest::Response,
    ) -> Result<RawResponse, EngineError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::Network(format!("Reading body of {} failed: {}", url, e)))?;

        log::debug!("{} -> status {}, {} bytes", url, status, body.len());

        Ok(RawResponse { status, body })
    }
}

/// Scheme + host (+ port) of a URL, for Origin/Referer headers.
fn extract_origin(url: &str) -> Result<String, EngineError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| EngineError::Config(format!("Invalid URL {}: {}", url, e)))?;
    let host = parsed.host_str().unwrap_or("");

    match parsed.port() {
        Some(port) => Ok(format!("{}://{}:{}", parsed.scheme(), host, port)),
        None => Ok(format!("{}://{}", parsed.scheme(), host)),
    }
}
