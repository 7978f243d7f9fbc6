//! Process configuration, read once at startup from flags or the environment.

use std::time::Duration;

use atb_lib::atb_api::{CatalogQuery, ClientOptions, DEFAULT_BASE_URL};
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "atb-discounts")]
#[command(about = "Serve the current ATB economy discounts as JSON and HTML")]
pub struct Config {
    /// Interface to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Site root of the ATB shop
    #[arg(long, env = "ATB_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Store whose prices are scraped
    #[arg(long, env = "ATB_STORE_ID", default_value = "1154")]
    pub store: String,

    /// Catalog category filter
    #[arg(long, env = "ATB_CATEGORY", default_value = "economy")]
    pub category: String,

    /// Timeout for each catalog page request, in seconds
    #[arg(long, env = "ATB_REQUEST_TIMEOUT_SECS", default_value_t = 5)]
    pub request_timeout_secs: u64,

    /// How long a scraped list is served before it is refreshed, in minutes
    #[arg(long, env = "ATB_CACHE_FRESH_MINS", default_value_t = 100)]
    pub fresh_for_mins: u64,

    /// How long an unrefreshed list is kept at all, in minutes
    #[arg(long, env = "ATB_CACHE_EXPIRE_MINS", default_value_t = 120)]
    pub expire_after_mins: u64,
}

impl Config {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            query: CatalogQuery::default()
                .with_category(&self.category)
                .with_store(&self.store),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn fresh_for(&self) -> Duration {
        Duration::from_secs(self.fresh_for_mins * 60)
    }

    pub fn expire_after(&self) -> Duration {
        Duration::from_secs(self.expire_after_mins * 60)
    }
}
