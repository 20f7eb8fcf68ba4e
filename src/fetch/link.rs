// src/fetch/link.rs
use scraper::{Html, Selector};

/// Anchor text of the export link in the report emails.
pub const EXPORT_LINK_TEXT: &str = "Baixar CSV";

/// Return the `href` of the first anchor whose text is exactly
/// `EXPORT_LINK_TEXT` (surrounding whitespace ignored).
pub fn extract_export_link(html: &str) -> Option<String> {
    find_link_by_text(html, EXPORT_LINK_TEXT)
}

pub fn find_link_by_text(html: &str, label: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("selector should parse");

    document
        .select(&selector)
        .filter(|el| el.text().collect::<String>().trim() == label)
        .filter_map(|el| el.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty())
        .map(str::to_string)
}
