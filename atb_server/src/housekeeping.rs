use std::time::Duration;

use atb_lib::{DiscountService, PageParser, PageSource};
use tokio::time::sleep;
use tracing::info;

/// How often the cache is checked for values past their hard expiry.
pub const CLEANUP_EVERY: Duration = Duration::from_secs(60);

/// Periodically drops the cached list once it is past the hard expiry, so an
/// idle server does not keep serving memory to a list nobody asked for.
pub fn start_cleanup<S, P>(service: DiscountService<S, P>, every: Duration) -> tokio::task::JoinHandle<()>
where
    S: PageSource + 'static,
    P: PageParser + 'static,
{
    tokio::spawn(async move {
        loop {
            sleep(every).await;
            let removed = service.purge_expired();
            if removed > 0 {
                info!(removed, "evicted expired discount list");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use atb_lib::atb_api::{self, types::DiscountPage};
    use atb_lib::{CatalogParser, DiscountScraper};

    const FRESH: Duration = Duration::from_secs(100 * 60);
    const EXPIRE: Duration = Duration::from_secs(120 * 60);

    const SALE_CARD: &str = r#"<div class="catalog-item">
      <div class="catalog-item__title"><a href="/p/1">Milk</a></div>
      <div class="catalog-item__product-price product-price--sale">
        <data class="product-price__top" value="30"></data>
        <data class="product-price__bottom" value="40"></data>
      </div></div>"#;

    struct OnePage;

    #[async_trait]
    impl PageSource for OnePage {
        async fn fetch_page(&self, _page: u32) -> Result<DiscountPage, atb_api::Error> {
            Ok(DiscountPage {
                markup: SALE_CARD.to_string(),
                next_page: false,
            })
        }

        fn source_url(&self) -> String {
            "memory://catalog".to_string()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn expired_list_is_evicted_without_requests() {
        let parser = CatalogParser::new("https://example.com").unwrap();
        let service = DiscountService::new(DiscountScraper::new(OnePage, parser), FRESH, EXPIRE);
        assert_eq!(service.get_items().await.unwrap().len(), 1);

        let cleanup = start_cleanup(service.clone(), CLEANUP_EVERY);

        // Stale but not yet expired.
        sleep(Duration::from_secs(110 * 60)).await;
        assert!(service.has_items());

        sleep(Duration::from_secs(11 * 60)).await;
        assert!(!service.has_items());
        cleanup.abort();
    }
}
