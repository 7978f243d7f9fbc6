use serde::{Deserialize, Serialize};

/// One response of the catalog "load more" endpoint.
///
/// `markup` is an HTML fragment with the product cards of a single page;
/// `next_page` tells whether another page follows. Missing fields fall back
/// to an empty fragment and `false`, which ends pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountPage {
    #[serde(default)]
    pub markup: String,
    #[serde(default)]
    pub next_page: bool,
}
