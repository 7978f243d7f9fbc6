//! The discounted product record and the numeric rules around it.

use serde::{Deserialize, Serialize};

/// One discounted product scraped from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountItem {
    pub title: String,
    /// Absolute product link, or empty when the card has none.
    pub url: String,
    pub image_url: String,
    pub current_price: f64,
    pub old_price: f64,
    /// Percentage off the old price. Not clamped: a price increase is negative.
    pub discount: i64,
    /// Currency label shown next to the price, e.g. `грн`.
    pub unit: String,
}

/// Rounded percentage saved going from `old_price` to `current_price`.
///
/// An `old_price` of zero yields 0, as does any non-finite intermediate.
pub fn discount_percent(old_price: f64, current_price: f64) -> i64 {
    if old_price == 0.0 {
        return 0;
    }
    let pct = ((old_price - current_price) / old_price * 100.0).round();
    if pct.is_finite() {
        pct as i64
    } else {
        0
    }
}

/// Sorts by discount, largest first. Equal discounts keep their scan order.
pub fn sort_by_discount(items: &mut [DiscountItem]) {
    items.sort_by(|a, b| b.discount.cmp(&a.discount));
}
