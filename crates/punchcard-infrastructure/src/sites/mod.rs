mod discuz;
mod flarum;
mod json_api;

pub use discuz::DiscuzAdapter;
pub use flarum::FlarumAdapter;
pub use json_api::JsonApiAdapter;

use std::sync::Arc;

use punchcard_domain::config::{SiteConfig, SiteKind};
use punchcard_domain::site::SiteAdapter;
use punchcard_domain::EngineError;

use crate::http::HttpClient;

/// Build the adapter for a configured site.
pub fn build_adapter(
    name: &str,
    site: &SiteConfig,
    proxy: Option<String>,
) -> Result<Arc<dyn SiteAdapter>, EngineError> {
    let http = HttpClient::with_proxy(proxy)?;
    let base_url = site.base_url.trim_end_matches('/').to_string();

    Ok(match site.kind {
        SiteKind::Flarum => Arc::new(FlarumAdapter::new(name, base_url, http)),
        SiteKind::Discuz => Arc::new(DiscuzAdapter::new(name, base_url, http)),
        SiteKind::JsonApi => Arc::new(JsonApiAdapter::new(name, base_url, http)),
    })
}
