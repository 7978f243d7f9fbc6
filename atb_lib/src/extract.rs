//! Turns one page of catalog markup into discount items.

use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractError;
use crate::item::{discount_percent, DiscountItem};

const ITEM: &str = ".catalog-item";
const PRICE: &str = ".catalog-item__product-price";
const SALE_CLASS: &str = "product-price--sale";
const OLD_PRICE: &str = ".product-price__bottom";
const CURRENT_PRICE: &str = ".product-price__top";
const UNIT: &str = "abbr.product-price__currency-abbr";
const TITLE_LINK: &str = ".catalog-item__title > a";
const IMAGE: &str = ".catalog-item__img";

/// Extracts discount items from the markup of a single catalog page.
pub trait PageParser: Send + Sync {
    fn parse(&self, markup: &str) -> Result<Vec<DiscountItem>, ExtractError>;
}

struct Selectors {
    item: Selector,
    price: Selector,
    old_price: Selector,
    current_price: Selector,
    unit: Selector,
    title_link: Selector,
    image: Selector,
}

impl Selectors {
    fn compile() -> Result<Self, ExtractError> {
        Ok(Self {
            item: selector(ITEM)?,
            price: selector(PRICE)?,
            old_price: selector(OLD_PRICE)?,
            current_price: selector(CURRENT_PRICE)?,
            unit: selector(UNIT)?,
            title_link: selector(TITLE_LINK)?,
            image: selector(IMAGE)?,
        })
    }
}

fn selector(css: &'static str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        selector: css,
        reason: e.to_string(),
    })
}

/// [`PageParser`] for the ATB product card layout.
///
/// Only cards whose price block is marked as a sale produce an item. Links
/// are site-relative on the catalog, so a non-empty `href` is prefixed with
/// the base URL as-is.
pub struct CatalogParser {
    base_url: String,
    selectors: Selectors,
}

impl CatalogParser {
    pub fn new(base_url: &str) -> Result<Self, ExtractError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            selectors: Selectors::compile()?,
        })
    }

    fn parse_item(&self, card: ElementRef<'_>) -> Option<DiscountItem> {
        let sel = &self.selectors;
        let price = card.select(&sel.price).next()?;
        if !price.value().classes().any(|class| class == SALE_CLASS) {
            return None;
        }

        let old_price = attr_f64(price, &sel.old_price, "value");
        let current_price = attr_f64(price, &sel.current_price, "value");
        let unit = price
            .select(&sel.unit)
            .next()
            .map(trimmed_text)
            .unwrap_or_default();

        let link = card.select(&sel.title_link).next();
        let title = link.map(trimmed_text).unwrap_or_default();
        let href = link
            .and_then(|a| a.value().attr("href"))
            .unwrap_or_default();
        let url = if href.is_empty() {
            String::new()
        } else {
            format!("{}{}", self.base_url, href)
        };

        let image_url = card
            .select(&sel.image)
            .next()
            .and_then(|img| img.value().attr("src"))
            .unwrap_or_default()
            .to_string();

        Some(DiscountItem {
            title,
            url,
            image_url,
            current_price,
            old_price,
            discount: discount_percent(old_price, current_price),
            unit,
        })
    }
}

impl PageParser for CatalogParser {
    /// The HTML parser recovers from malformed markup, so a page that
    /// compiles its selectors never fails here.
    fn parse(&self, markup: &str) -> Result<Vec<DiscountItem>, ExtractError> {
        let doc = Html::parse_fragment(markup);
        Ok(doc
            .select(&self.selectors.item)
            .filter_map(|card| self.parse_item(card))
            .collect())
    }
}

fn trimmed_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn attr_f64(scope: ElementRef<'_>, sel: &Selector, attr: &str) -> f64 {
    scope
        .select(sel)
        .next()
        .and_then(|el| el.value().attr(attr))
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
