pub mod business;
pub mod dom;
pub mod embedded;
pub mod selectors;
pub mod text;

use scraper::Html;

use crate::output::{BusinessInfo, ReviewRecord};

/// Extraction strategies in fallback order: each one runs only when every
/// earlier one came back empty for the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Embedded cache objects in inline script blocks.
    Embedded,
    /// aria-label star-rating heuristic over candidate containers.
    DomHeuristic,
    /// Fixed CSS selector table with climbing recovery.
    SelectorTable,
}

impl Strategy {
    pub const FALLBACK_ORDER: [Strategy; 3] = [
        Strategy::Embedded,
        Strategy::DomHeuristic,
        Strategy::SelectorTable,
    ];

    fn run(self, doc: &Html) -> Vec<ReviewRecord> {
        match self {
            Strategy::Embedded => {
                let (raw, users) = embedded::extract(doc);
                resolve_authors(raw, &users)
            }
            Strategy::DomHeuristic => dom::extract(doc),
            Strategy::SelectorTable => selectors::extract(doc),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Embedded => "embedded-json",
            Strategy::DomHeuristic => "dom-heuristic",
            Strategy::SelectorTable => "selector-table",
        }
    }
}

/// Everything one document yields: its reviews (not yet deduped across
/// documents), its business metadata, and which strategy produced the rows.
pub struct DocumentExtraction {
    pub reviews: Vec<ReviewRecord>,
    pub business: BusinessInfo,
    pub strategy: Option<Strategy>,
}

/// Linear pipeline over one document: ordered strategy fallback for the
/// reviews, then business metadata.
pub fn extract_document(raw_html: &str) -> DocumentExtraction {
    let doc = Html::parse_document(raw_html);

    let mut reviews = Vec::new();
    let mut strategy = None;
    for candidate in Strategy::FALLBACK_ORDER {
        reviews = candidate.run(&doc);
        if !reviews.is_empty() {
            strategy = Some(candidate);
            break;
        }
    }

    let business = business::extract(&doc);

    DocumentExtraction {
        reviews,
        business,
        strategy,
    }
}

/// Swap each review's author reference for the display name in the same
/// document's user directory; unknown references become an empty reviewer.
fn resolve_authors(raw: Vec<embedded::RawReview>, users: &embedded::UserDirectory) -> Vec<ReviewRecord> {
    raw.into_iter()
        .map(|r| ReviewRecord {
            review_id: r.review_id,
            reviewer: users.get(&r.author_ref).cloned().unwrap_or_default(),
            stars: r.stars,
            date_local: r.date_local,
            title: None,
            text: r.text,
        })
        .collect()
}

// ── Tests ──
