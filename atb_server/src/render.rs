//! HTML rendering of the discount list.

use atb_lib::DiscountItem;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

/// Renders the full page listing `items` in the order given.
pub fn render_page(items: &[DiscountItem]) -> String {
    let mut cards = String::new();
    for item in items {
        cards.push_str(&render_item(item));
    }
    let body = if items.is_empty() {
        r#"<p class="empty">Знижок зараз немає.</p>"#.to_string()
    } else {
        format!(r#"<ul class="items">{cards}</ul>"#)
    };
    format!(
        r#"<!doctype html>
<html lang="uk">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Економ знижки АТБ</title>
<link rel="stylesheet" href="/style.css">
</head>
<body>
<header><h1>Економ знижки АТБ</h1><p class="count">{count} товарів</p></header>
<main>{body}</main>
</body>
</html>
"#,
        count = items.len(),
    )
}

fn render_item(item: &DiscountItem) -> String {
    let title = if item.url.is_empty() {
        text(&item.title).to_string()
    } else {
        format!(
            r#"<a href="{}" target="_blank" rel="noopener">{}</a>"#,
            attr(&item.url),
            text(&item.title)
        )
    };
    let image = if item.image_url.is_empty() {
        String::new()
    } else {
        format!(
            r#"<img src="{}" alt="{}" loading="lazy">"#,
            attr(&item.image_url),
            attr(&item.title)
        )
    };
    format!(
        r#"<li class="item">{image}<div class="info"><span class="discount">-{discount}%</span><h2>{title}</h2><p class="price"><span class="current">{current} {unit}</span> <s class="old">{old} {unit}</s></p></div></li>"#,
        discount = item.discount,
        current = format_price(item.current_price),
        old = format_price(item.old_price),
        unit = text(&item.unit),
    )
}

/// Two decimals, the way prices are printed on the shop.
pub fn format_price(price: f64) -> String {
    format!("{:.2}", price)
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
