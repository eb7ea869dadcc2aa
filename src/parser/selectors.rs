//! Selector-table extraction for listing pages that expose review cards
//! through stable class names rather than embedded data. Update the selector
//! chains here when the site reworks its markup.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use super::business::bubble_rating;
use super::text::norm;
use crate::output::ReviewRecord;

static CARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.review-container, div[data-reviewid]").unwrap());
static REVIEWER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "a.ui_header_link, \
         div.member_info div.username, \
         div.info_text > div",
    )
    .unwrap()
});
static RATING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.ui_bubble_rating").unwrap());
static DATE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span.ratingDate").unwrap());
static TITLE_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.title span.noQuotes, span.noQuotes, a.title").unwrap());
static TEXT_EL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.partial_entry, div.entry p, q").unwrap());

/// A row needs a decoded rating and this much normalized text to count as a
/// review rather than a summary snippet.
const MIN_TEXT_CHARS: usize = 20;
/// Below this many direct hits the recovery pass kicks in.
const MIN_ROWS: usize = 5;
/// How far the recovery pass climbs from a rating element.
const MAX_CLIMB: usize = 8;

const BLOCK_TAGS: &[&str] = &["div", "section", "article", "li"];

pub fn extract(doc: &Html) -> Vec<ReviewRecord> {
    let mut rows: Vec<ReviewRecord> =
        doc.select(&CARD).filter_map(|card| card_row(&card)).collect();

    // Markup drifts. When direct card selection comes up short, climb from
    // every rating element to its enclosing block and retry there; duplicate
    // rows are left for the global dedupe pass.
    if rows.len() < MIN_ROWS {
        for rating_el in doc.select(&RATING) {
            if let Some(scope) = enclosing_block(&rating_el) {
                if let Some(row) = card_row(&scope) {
                    rows.push(row);
                }
            }
        }
    }

    rows
}

fn card_row(scope: &ElementRef) -> Option<ReviewRecord> {
    let rating = scope.select(&RATING).next().and_then(|el| bubble_rating(&el))?;
    let text = scope
        .select(&TEXT_EL)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default();
    if text.chars().count() < MIN_TEXT_CHARS {
        return None;
    }

    let reviewer = scope
        .select(&REVIEWER)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default();
    let date_local = scope
        .select(&DATE)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default();
    let title = scope
        .select(&TITLE_LINK)
        .next()
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty());

    Some(ReviewRecord {
        review_id: scope
            .value()
            .attr("data-reviewid")
            .unwrap_or_default()
            .to_string(),
        reviewer,
        stars: Value::from(rating),
        date_local,
        title,
        text,
    })
}

fn enclosing_block<'a>(el: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .take(MAX_CLIMB)
        .find(|ancestor| BLOCK_TAGS.contains(&ancestor.value().name()))
}

fn element_text(el: &ElementRef) -> String {
    norm(&el.text().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD_HTML: &str = r#"
        <div class="review-container" data-reviewid="123">
            <div class="member_info"><a class="ui_header_link" href="/Profile/j">JohnT</a></div>
            <span class="ui_bubble_rating bubble_40"></span>
            <span class="ratingDate">January 2, 2024</span>
            <a class="title"><span class="noQuotes">Lovely evening</span></a>
            <p class="partial_entry">The tasting menu was outstanding from start to finish.</p>
        </div>"#;

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{body}</body></html>"))
    }

    #[test]
    fn full_card() {
        // Under five direct hits the recovery pass re-extracts the same card,
        // so the row shows up twice; the global dedupe collapses that later.
        let reviews = extract(&doc(CARD_HTML));
        assert_eq!(reviews.len(), 2);
        let r = &reviews[0];
        assert_eq!(r.review_id, "123");
        assert_eq!(r.reviewer, "JohnT");
        assert_eq!(r.stars, Value::from(4.0));
        assert_eq!(r.date_local, "January 2, 2024");
        assert_eq!(r.title.as_deref(), Some("Lovely evening"));
        assert_eq!(r.text, "The tasting menu was outstanding from start to finish.");
        assert_eq!(reviews[1].identity(), r.identity());
    }

    #[test]
    fn short_text_is_rejected() {
        let html = doc(
            r#"<div class="review-container">
                <span class="ui_bubble_rating bubble_50"></span>
                <p class="partial_entry">Too short.</p>
            </div>"#,
        );
        assert!(extract(&html).is_empty());
    }

    #[test]
    fn missing_rating_is_rejected() {
        let html = doc(
            r#"<div class="review-container">
                <p class="partial_entry">Plenty of text but nothing rated here at all.</p>
            </div>"#,
        );
        assert!(extract(&html).is_empty());
    }

    #[test]
    fn zero_bubble_is_a_real_rating() {
        let html = doc(
            r#"<div class="review-container">
                <span class="ui_bubble_rating bubble_0"></span>
                <p class="partial_entry">Genuinely terrible experience, zero stars from me.</p>
            </div>"#,
        );
        let reviews = extract(&html);
        assert!(!reviews.is_empty());
        assert_eq!(reviews[0].stars, Value::from(0.0));
    }

    #[test]
    fn climbing_recovery_finds_unwrapped_cards() {
        // No .review-container / data-reviewid anywhere: the first pass finds
        // nothing and the recovery pass climbs from the rating element.
        let html = doc(
            r#"<div class="rebranded-card">
                <span class="wrapper"><span class="ui_bubble_rating bubble_30"></span></span>
                <span class="ratingDate">March 5, 2023</span>
                <p class="partial_entry">Service was slow but the food made up for every minute.</p>
            </div>"#,
        );
        let reviews = extract(&html);
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].stars, Value::from(3.0));
        assert_eq!(reviews[0].date_local, "March 5, 2023");
    }

    #[test]
    fn enough_direct_rows_skip_recovery() {
        let many: String = (0..5)
            .map(|i| {
                format!(
                    r#"<div class="review-container" data-reviewid="id{i}">
                        <span class="ui_bubble_rating bubble_40"></span>
                        <p class="partial_entry">Review number {i} with more than enough text to pass.</p>
                    </div>"#
                )
            })
            .collect();
        let reviews = extract(&doc(&many));
        assert_eq!(reviews.len(), 5);
    }
}
