//! Pagination loop over the catalog endpoint.

use async_trait::async_trait;

use atb_api::types::DiscountPage;
use atb_api::Client;

use crate::error::{ExtractError, ScrapeError};
use crate::extract::{CatalogParser, PageParser};
use crate::item::{sort_by_discount, DiscountItem};

/// Something that can hand out catalog pages by number.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, page: u32) -> Result<DiscountPage, atb_api::Error>;

    /// Where pages come from, for diagnostics.
    fn source_url(&self) -> String;
}

#[async_trait]
impl PageSource for Client {
    async fn fetch_page(&self, page: u32) -> Result<DiscountPage, atb_api::Error> {
        self.get_page(page).await
    }

    fn source_url(&self) -> String {
        self.catalog_url().to_string()
    }
}

/// Walks the catalog page by page and collects every discounted item.
///
/// Pages are requested strictly one after another starting at 0; the
/// `next_page` flag of page N decides whether page N+1 is requested. There is
/// no page cap.
pub struct DiscountScraper<S, P> {
    source: S,
    parser: P,
}

impl DiscountScraper<Client, CatalogParser> {
    /// Scraper over the live catalog, resolving item links against the client's base URL.
    pub fn from_client(client: Client) -> Result<Self, ExtractError> {
        let parser = CatalogParser::new(client.base_url())?;
        Ok(Self::new(client, parser))
    }
}

impl<S: PageSource, P: PageParser> DiscountScraper<S, P> {
    pub fn new(source: S, parser: P) -> Self {
        Self { source, parser }
    }

    /// Fetches all pages and returns their items sorted by discount, largest first.
    ///
    /// Any failed page aborts the whole scrape. An empty result is logged
    /// but returned as success.
    pub async fn scrape(&self) -> Result<Vec<DiscountItem>, ScrapeError> {
        let mut items = Vec::new();
        let mut page = 0u32;
        loop {
            let resp = self.source.fetch_page(page).await?;
            let page_items = self
                .parser
                .parse(&resp.markup)
                .map_err(|source| ScrapeError::Extract { page, source })?;
            tracing::debug!("Page {} yielded {} discount items", page, page_items.len());
            items.extend(page_items);

            page += 1;
            if !resp.next_page {
                break;
            }
        }

        if items.is_empty() {
            tracing::warn!(
                "Scraped 0 items from {}, does not seem right",
                self.source.source_url()
            );
        }
        sort_by_discount(&mut items);
        tracing::info!("Scraped {} discount items from {} pages", items.len(), page);
        Ok(items)
    }
}
