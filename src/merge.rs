use std::collections::HashSet;

use crate::output::ReviewRecord;

/// Collapse the concatenated per-document lists into the final output order.
/// First occurrence of an identity wins; records with empty text never pass.
/// The sort is descending lexicographic on the raw `date_local` string;
/// sources emit display dates, so mixed formats interleave in string order,
/// not chronological order.
pub fn dedupe_and_sort(reviews: Vec<ReviewRecord>) -> Vec<ReviewRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(reviews.len());

    for review in reviews {
        if review.text.is_empty() {
            continue;
        }
        if !seen.insert(review.identity()) {
            continue;
        }
        out.push(review);
    }

    out.sort_by(|a, b| b.date_local.cmp(&a.date_local));
    out
}
