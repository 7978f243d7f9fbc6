//! The cached "current discounts" value the web layer serves.

use std::sync::Arc;
use std::time::Duration;

use atb_api::Client;

use crate::cache::SingleFlightCache;
use crate::error::ScrapeError;
use crate::extract::{CatalogParser, PageParser};
use crate::fetch::{DiscountScraper, PageSource};
use crate::item::DiscountItem;

/// Cache key of the discount list; the only key the service uses.
pub const ITEMS_KEY: &str = "items";

pub type Items = Arc<Vec<DiscountItem>>;

/// Scraper behind a single-flight cache.
///
/// Cloning is cheap; all clones share the same cache and scraper.
pub struct DiscountService<S = Client, P = CatalogParser> {
    scraper: Arc<DiscountScraper<S, P>>,
    cache: Arc<SingleFlightCache<Items, ScrapeError>>,
}

impl<S, P> Clone for DiscountService<S, P> {
    fn clone(&self) -> Self {
        Self {
            scraper: Arc::clone(&self.scraper),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<S, P> DiscountService<S, P>
where
    S: PageSource + 'static,
    P: PageParser + 'static,
{
    pub fn new(scraper: DiscountScraper<S, P>, fresh_for: Duration, expire_after: Duration) -> Self {
        Self {
            scraper: Arc::new(scraper),
            cache: Arc::new(SingleFlightCache::new(fresh_for, expire_after)),
        }
    }

    /// Current discount list, scraping the catalog when the cached one is stale.
    pub async fn get_items(&self) -> Result<Items, Arc<ScrapeError>> {
        let scraper = Arc::clone(&self.scraper);
        self.cache
            .get_or_compute(ITEMS_KEY, move || async move {
                scraper.scrape().await.map(Arc::new)
            })
            .await
    }

    /// Whether a discount list, fresh or stale, is currently held.
    pub fn has_items(&self) -> bool {
        self.cache.contains_key(ITEMS_KEY)
    }

    /// Drops the cached list once it is past the hard expiry.
    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }
}
