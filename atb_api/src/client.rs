//! HTTP client for the ATB catalog "load more" endpoint.

use std::time::Duration;

use url::Url;

use crate::{query::CatalogQuery, types::DiscountPage, user_agent::get_user_agent, Error};

/// Production site root.
pub const DEFAULT_BASE_URL: &str = "https://www.atbmarket.com";

const CATALOG_PATH: &str = "shop/catalog/wloadmore/";

/// Settings for a [`Client`].
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Site root. A trailing slash is stripped.
    pub base_url: String,
    /// Category and store sent with every page request.
    pub query: CatalogQuery,
    /// Timeout applied to each page request.
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            query: CatalogQuery::default(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// HTTP client for the catalog endpoint.
///
/// Sends requests with a browser user agent and the headers the site's own
/// "load more" button sends. The underlying `reqwest::Client` is built once
/// and shared by all page requests.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    catalog_url: Url,
    query: CatalogQuery,
}

impl Client {
    /// Creates a client pointing at the production site with default options.
    pub fn new() -> Result<Self, Error> {
        Self::with_options(ClientOptions::default())
    }

    /// Creates a client with a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        Self::with_options(ClientOptions {
            base_url: base_url.to_string(),
            ..ClientOptions::default()
        })
    }

    pub fn with_options(options: ClientOptions) -> Result<Self, Error> {
        let base_url = options.base_url.trim_end_matches('/').to_string();
        let catalog_url = Url::parse(&format!("{}/{}", base_url, CATALOG_PATH))?;
        let http = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .timeout(options.timeout)
            .build()
            .map_err(Error::Client)?;
        Ok(Self {
            http,
            base_url,
            catalog_url,
            query: options.query,
        })
    }

    /// Site root without a trailing slash, used to absolutize item links.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Catalog endpoint URL without query parameters.
    pub fn catalog_url(&self) -> &Url {
        &self.catalog_url
    }

    /// Fetches one catalog page.
    pub async fn get_page(&self, page: u32) -> Result<DiscountPage, Error> {
        let url = self
            .query
            .clone()
            .with_page(page)
            .add_to_url(&self.catalog_url);
        tracing::debug!("Requesting catalog page {}: {}", page, url);

        let resp = self
            .http
            .get(url)
            .header("accept", "application/json, text/javascript, */*; q=0.01")
            .header("accept-language", "uk-UA,uk;q=0.9,en-US;q=0.8,en;q=0.7")
            .header("x-requested-with", "XMLHttpRequest")
            .header("referer", format!("{}/", self.base_url))
            .send()
            .await
            .map_err(|source| {
                tracing::error!("Failed to get catalog page {}: {}", page, source);
                Error::Transport { page, source }
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|source| {
            tracing::error!("Failed to read catalog page {} body: {}", page, source);
            Error::Transport { page, source }
        })?;

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::error!(
                "Catalog page {} failed with status {}: {}",
                page,
                status,
                snippet
            );
            return Err(Error::HttpStatus {
                page,
                status: status.as_u16(),
                body: snippet,
            });
        }

        serde_json::from_str::<DiscountPage>(&body).map_err(|source| {
            tracing::error!(
                "Failed to parse catalog page {}: {} | body: {}",
                page,
                source,
                truncate_body(&body)
            );
            Error::Decode { page, source }
        })
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &body[..end])
}
