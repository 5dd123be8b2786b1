//! Listing page parser (creator profiles and browse pages)
//!
//! Pure function: HTML in, structured records out. The pipeline tolerates
//! empty results: a page with no game cells is "no data yet", not an error.

use crate::url::resolve_url;
use chrono::NaiveDate;
use scraper::{Html, Selector};
use url::Url;

/// One item found on a listing page
#[derive(Debug, Clone)]
pub struct ListedItem {
    /// Canonical (resolved, normalized) item URL
    pub url: Url,
    /// Title text, when the cell carries one
    pub title: Option<String>,
    /// Publish date, when the cell carries one
    pub publish_date: Option<NaiveDate>,
}

/// Result of parsing one listing page
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub items: Vec<ListedItem>,
    /// Next pagination page, resolved against the page it was found on
    pub next_page: Option<Url>,
}

/// Extracts items and the next-page link from a listing page.
///
/// `base` MUST be the URL of the page the HTML came from: item links and
/// pagination links are routinely relative.
pub fn parse_listing(html: &str, base: &Url) -> Listing {
    let document = Html::parse_document(html);

    let mut items = Vec::new();

    if let (Ok(cell_sel), Ok(title_sel), Ok(link_sel), Ok(date_sel)) = (
        Selector::parse("div.game_cell"),
        Selector::parse("a.title"),
        Selector::parse("a.game_link"),
        Selector::parse("div.published_at"),
    ) {
        for cell in document.select(&cell_sel) {
            // Prefer the title link; fall back to any game link with text.
            let link = cell
                .select(&title_sel)
                .next()
                .or_else(|| {
                    cell.select(&link_sel)
                        .find(|l| !l.text().collect::<String>().trim().is_empty())
                })
                .or_else(|| cell.select(&link_sel).next());

            let Some(link) = link else { continue };
            let Some(href) = link.value().attr("href") else {
                continue;
            };

            let Ok(url) = resolve_url(base, href) else {
                continue;
            };

            let title = {
                let text = link.text().collect::<String>().trim().to_string();
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            };

            let publish_date = cell
                .select(&date_sel)
                .next()
                .map(|el| el.text().collect::<String>())
                .and_then(|text| parse_date_text(&text));

            items.push(ListedItem {
                url,
                title,
                publish_date,
            });
        }
    }

    let next_page = Selector::parse("a.next_page").ok().and_then(|next_sel| {
        document
            .select(&next_sel)
            .next()
            .and_then(|el| el.value().attr("href"))
            .and_then(|href| resolve_url(base, href).ok())
    });

    Listing { items, next_page }
}

/// Parses the storefront's publish-date text.
///
/// Accepted shapes: "Published Jan 15, 2024", "Jan 15, 2024",
/// "January 15, 2024".
fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.replace("Published", "");
    let text = text.trim();

    NaiveDate::parse_from_str(text, "%b %d, %Y")
        .or_else(|_| NaiveDate::parse_from_str(text, "%B %d, %Y"))
        .ok()
}
