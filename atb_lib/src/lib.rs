//! Discount scraping core: markup extraction, catalog pagination and a
//! single-flight cache around the whole pipeline.

pub mod cache;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod item;
pub mod service;

pub use atb_api;

pub use cache::SingleFlightCache;
pub use error::{ExtractError, ScrapeError};
pub use extract::{CatalogParser, PageParser};
pub use fetch::{DiscountScraper, PageSource};
pub use item::DiscountItem;
pub use service::{DiscountService, Items, ITEMS_KEY};
