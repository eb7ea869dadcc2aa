use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use super::text::norm;
use crate::output::ReviewRecord;

static CANDIDATES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article, section, div, li").unwrap());
static LABELED: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[aria-label]").unwrap());
static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());
static DATE_NODES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("time, span, div").unwrap());
static USER_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*="/user_details"]"#).unwrap());

static STAR_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(star rating|étoile)").unwrap());
static NUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+(?:[.,][0-9]+)?").unwrap());
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b20\d{2}\b").unwrap());
static FR_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(janvier|février|mars|avril|mai|juin|juillet|août|septembre|octobre|novembre|décembre)")
        .unwrap()
});

/// Heuristic card scan for mobile/AMP pages that inline their review cards.
/// A container qualifies when it has a star-rating aria-label (English or
/// French) and at least one paragraph; the review text is the longest
/// paragraph by character count.
pub fn extract(doc: &Html) -> Vec<ReviewRecord> {
    let mut out = Vec::new();

    for container in doc.select(&CANDIDATES) {
        let Some(star_el) = star_element(&container) else {
            continue;
        };
        if container.select(&PARAGRAPH).next().is_none() {
            continue;
        }

        let label = star_el
            .value()
            .attr("aria-label")
            .map(str::to_string)
            .unwrap_or_else(|| element_text(&star_el));
        let stars = NUM_RE
            .find(&label)
            .map(|m| m.as_str().replace(',', "."))
            .unwrap_or_default();

        let mut date = String::new();
        for node in container.select(&DATE_NODES) {
            let s = element_text(&node);
            if YEAR_RE.is_match(&s) || FR_MONTH_RE.is_match(&s) {
                date = s;
                break;
            }
        }

        let reviewer = container
            .select(&USER_LINK)
            .next()
            .map(|a| element_text(&a))
            .unwrap_or_default();

        let text = container
            .select(&PARAGRAPH)
            .map(|p| element_text(&p))
            .filter(|t| !t.is_empty())
            .max_by_key(|t| t.chars().count())
            .unwrap_or_default();
        if text.is_empty() {
            continue;
        }

        out.push(ReviewRecord {
            review_id: String::new(),
            reviewer,
            stars: Value::String(stars),
            date_local: date,
            title: None,
            text,
        });
    }

    out
}

fn star_element<'a>(container: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    container.select(&LABELED).find(|el| {
        el.value()
            .attr("aria-label")
            .is_some_and(|label| STAR_LABEL_RE.is_match(label))
    })
}

fn element_text(el: &ElementRef) -> String {
    norm(&el.text().collect::<Vec<_>>().join(" "))
}
