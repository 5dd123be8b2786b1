//! Item detail page parser
//!
//! Pure function: HTML in, enrichment fields out. The important contract is
//! the rating tri-state: "the page says ratings are hidden" is a positive,
//! parsed signal and must never be conflated with "the page didn't parse".

use scraper::{Html, Selector};

/// What the page said about ratings
#[derive(Debug, Clone, PartialEq)]
pub enum RatingSignal {
    /// Aggregate rating widget present with a value
    Rated { rating: f64, count: u32 },
    /// Recognizable detail page with no rating widget: ratings are hidden
    /// or not yet visible
    Hidden,
    /// Page did not look like an item detail page; treat as a parse failure
    Unknown,
}

/// Enrichment fields extracted from a detail page
#[derive(Debug, Clone)]
pub struct Detail {
    pub ratings: RatingSignal,
    pub comment_count: u32,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

/// Parses an item detail page.
///
/// The tri-state decision: a page with the aggregate-rating widget is
/// `Rated`; a page that carries the detail info panel but no widget is
/// `Hidden` (the storefront hides ratings until enough votes arrive); a page
/// with neither is `Unknown`: malformed, an interstitial, or not a detail
/// page at all.
pub fn parse_detail(html: &str) -> Detail {
    let document = Html::parse_document(html);

    Detail {
        ratings: rating_signal(&document),
        comment_count: count_matches(&document, "div.community_post"),
        description: first_text(&document, "div.formatted_description"),
        tags: tag_list(&document),
    }
}

fn rating_signal(document: &Html) -> RatingSignal {
    let Ok(aggregate_sel) =
        Selector::parse(r#"div.aggregate_rating[itemprop="aggregateRating"]"#)
    else {
        return RatingSignal::Unknown;
    };

    match document.select(&aggregate_sel).next() {
        Some(widget) => {
            let rating = Selector::parse(r#"span[itemprop="ratingValue"]"#)
                .ok()
                .and_then(|sel| widget.select(&sel).next())
                .and_then(|el| el.text().collect::<String>().trim().parse::<f64>().ok());

            let count = Selector::parse(r#"span[itemprop="ratingCount"]"#)
                .ok()
                .and_then(|sel| widget.select(&sel).next())
                .and_then(|el| el.text().collect::<String>().trim().parse::<u32>().ok())
                .unwrap_or(0);

            match rating {
                Some(rating) => RatingSignal::Rated { rating, count },
                // Widget present but unreadable value
                None => RatingSignal::Unknown,
            }
        }
        None => {
            if count_matches(document, "div.game_info_panel_widget") > 0 {
                RatingSignal::Hidden
            } else {
                RatingSignal::Unknown
            }
        }
    }
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn count_matches(document: &Html, selector: &str) -> u32 {
    Selector::parse(selector)
        .map(|sel| document.select(&sel).count() as u32)
        .unwrap_or(0)
}

fn tag_list(document: &Html) -> Vec<String> {
    let Ok(tag_sel) = Selector::parse(r#"div.game_info_panel_widget a[href*="tag-"]"#) else {
        return Vec::new();
    };

    let mut tags: Vec<String> = document
        .select(&tag_sel)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    tags.dedup();
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATED_PAGE: &str = r#"
        <html><body>
        <div class="game_info_panel_widget"><table>
            <tr><td>Tags</td><td>
                <a href="/games/tag-puzzle">Puzzle</a>
                <a href="/games/tag-retro">Retro</a>
            </td></tr>
        </table></div>
        <div class="aggregate_rating" itemprop="aggregateRating">
            <span itemprop="ratingValue">4.5</span>
            (<span itemprop="ratingCount">20</span> ratings)
        </div>
        <div class="formatted_description">A tiny puzzle game.</div>
        <div class="community_post">nice!</div>
        <div class="community_post">loved it</div>
        </body></html>
    "#;

    const HIDDEN_PAGE: &str = r#"
        <html><body>
        <div class="game_info_panel_widget"><table>
            <tr><td>Status</td><td>Released</td></tr>
        </table></div>
        <div class="formatted_description">No votes yet.</div>
        </body></html>
    "#;

    #[test]
    fn test_rated_page() {
        let detail = parse_detail(RATED_PAGE);
        assert_eq!(
            detail.ratings,
            RatingSignal::Rated {
                rating: 4.5,
                count: 20
            }
        );
        assert_eq!(detail.comment_count, 2);
        assert_eq!(detail.description.as_deref(), Some("A tiny puzzle game."));
        assert_eq!(detail.tags, vec!["Puzzle", "Retro"]);
    }

    #[test]
    fn test_hidden_ratings_is_positive_signal() {
        let detail = parse_detail(HIDDEN_PAGE);
        assert_eq!(detail.ratings, RatingSignal::Hidden);
        assert_eq!(detail.comment_count, 0);
    }

    #[test]
    fn test_unrecognizable_page_is_unknown() {
        let detail = parse_detail("<html><body><h1>503 Service Unavailable</h1></body></html>");
        assert_eq!(detail.ratings, RatingSignal::Unknown);
    }

    #[test]
    fn test_widget_with_garbled_value_is_unknown() {
        let html = r#"
            <div class="game_info_panel_widget"></div>
            <div class="aggregate_rating" itemprop="aggregateRating">
                <span itemprop="ratingValue">n/a</span>
            </div>
        "#;
        let detail = parse_detail(html);
        assert_eq!(detail.ratings, RatingSignal::Unknown);
    }

    #[test]
    fn test_rating_without_count() {
        let html = r#"
            <div class="aggregate_rating" itemprop="aggregateRating">
                <span itemprop="ratingValue">3.8</span>
            </div>
        "#;
        let detail = parse_detail(html);
        assert_eq!(
            detail.ratings,
            RatingSignal::Rated {
                rating: 3.8,
                count: 0
            }
        );
    }

    #[test]
    fn test_empty_description_dropped() {
        let html = r#"
            <div class="game_info_panel_widget"></div>
            <div class="formatted_description">   </div>
        "#;
        let detail = parse_detail(html);
        assert_eq!(detail.description, None);
    }
}
