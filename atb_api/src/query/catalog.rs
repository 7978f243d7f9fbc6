//! Query builder for the catalog "load more" endpoint.

use url::Url;

/// Parameters of one catalog page request.
///
/// The endpoint filters by a custom category and a store, and pages are
/// numbered from 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Custom category filter. Defaults to `economy`.
    pub category: String,
    /// Store identifier whose prices are listed. Defaults to `1154`.
    pub store: String,
    /// Page number (0-indexed). Defaults to 0.
    pub page: u32,
}

impl Default for CatalogQuery {
    fn default() -> CatalogQuery {
        CatalogQuery {
            category: "economy".to_string(),
            store: "1154".to_string(),
            page: 0,
        }
    }
}

impl CatalogQuery {
    /// Appends the category, store and page parameters to the URL.
    pub fn add_to_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        url.query_pairs_mut()
            .append_pair("customCat", &self.category)
            .append_pair("store", &self.store)
            .append_pair("page", &self.page.to_string());
        url
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_store(mut self, store: &str) -> Self {
        self.store = store.to_string();
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }
}
