use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use super::text::norm;
use crate::output::BusinessInfo;

static LD_JSON: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());
static HEADING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1, h2").unwrap());
static OVERALL_BUBBLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.ui_bubble_rating").unwrap());

const BUSINESS_TYPES: &[&str] = &["LocalBusiness", "Restaurant", "Organization"];

/// Pull business metadata out of JSON-LD blocks. First-found wins per field;
/// later matching blocks never override an already-populated one. Falls back
/// to the first page heading for the name and to a bubble-class element for
/// the overall rating.
pub fn extract(doc: &Html) -> BusinessInfo {
    let mut info = BusinessInfo::default();

    for script in doc.select(&LD_JSON) {
        let raw: String = script.text().collect();
        let Ok(data) = serde_json::from_str::<Value>(raw.trim()) else {
            continue;
        };
        let Value::Object(map) = data else { continue };
        if !is_business_type(map.get("@type")) {
            continue;
        }

        fill_first(&mut info.name, map.get("name"));
        if let Some(Value::Object(agg)) = map.get("aggregateRating") {
            fill_first(&mut info.overall_rating, agg.get("ratingValue"));
            fill_first(&mut info.total_review_count, agg.get("reviewCount"));
        }
        fill_first(&mut info.price_range, map.get("priceRange"));

        if info.category.is_none() {
            info.category = category_of(&map);
        }
        if info.city.is_none() {
            info.city = map
                .get("address")
                .and_then(|a| a.get("addressLocality"))
                .and_then(Value::as_str)
                .map(|s| s.to_string())
                .filter(|s| !s.is_empty());
        }
    }

    if info.name.is_empty() {
        if let Some(heading) = doc.select(&HEADING).next() {
            info.name = norm(&heading.text().collect::<Vec<_>>().join(" "));
        }
    }

    if info.overall_rating.is_empty() {
        if let Some(rating) = doc.select(&OVERALL_BUBBLE).next().and_then(|el| bubble_rating(&el)) {
            info.overall_rating = format_rating(rating);
        }
    }

    info
}

/// Decode a `bubble_NN` CSS class into a rating out of 5: `bubble_45` → 4.5.
/// `bubble_0` is a genuine zero rating, distinct from "no bubble class".
pub fn bubble_rating(el: &ElementRef) -> Option<f64> {
    el.value()
        .classes()
        .find_map(|class| class.strip_prefix("bubble_"))
        .and_then(|digits| digits.parse::<f64>().ok())
        .map(|n| n / 10.0)
}

fn format_rating(rating: f64) -> String {
    if rating.fract() == 0.0 {
        format!("{}", rating as i64)
    } else {
        format!("{rating}")
    }
}

/// `@type` may be a single string or an array of types.
fn is_business_type(node_type: Option<&Value>) -> bool {
    match node_type {
        Some(Value::String(s)) => BUSINESS_TYPES.contains(&s.as_str()),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .any(|s| BUSINESS_TYPES.contains(&s)),
        _ => false,
    }
}

fn fill_first(slot: &mut String, value: Option<&Value>) {
    if !slot.is_empty() {
        return;
    }
    let rendered = match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return,
    };
    if !rendered.is_empty() {
        *slot = rendered;
    }
}

/// `servesCuisine` is a string on some pages and an array on others.
fn category_of(map: &serde_json::Map<String, Value>) -> Option<String> {
    match map.get("servesCuisine") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .find(|s| !s.is_empty())
            .map(|s| s.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!("<html><head></head><body>{body}</body></html>"))
    }

    fn ld(json: &str) -> String {
        format!(r#"<script type="application/ld+json">{json}</script>"#)
    }

    #[test]
    fn restaurant_block() {
        let html = doc(&ld(
            r#"{"@type":"Restaurant","name":"Chez Paul","priceRange":"$$",
               "servesCuisine":"French",
               "address":{"addressLocality":"Paris"},
               "aggregateRating":{"ratingValue":4.5,"reviewCount":128}}"#,
        ));
        let info = extract(&html);
        assert_eq!(info.name, "Chez Paul");
        assert_eq!(info.overall_rating, "4.5");
        assert_eq!(info.total_review_count, "128");
        assert_eq!(info.price_range, "$$");
        assert_eq!(info.category.as_deref(), Some("French"));
        assert_eq!(info.city.as_deref(), Some("Paris"));
    }

    #[test]
    fn first_block_wins_per_field() {
        let html = doc(&format!(
            "{}{}",
            ld(r#"{"@type":"LocalBusiness","name":"First Name"}"#),
            ld(r#"{"@type":"LocalBusiness","name":"Second Name","priceRange":"$$$"}"#),
        ));
        let info = extract(&html);
        assert_eq!(info.name, "First Name");
        // The later block still fills fields the first one left empty.
        assert_eq!(info.price_range, "$$$");
    }

    #[test]
    fn non_business_types_are_ignored() {
        let html = doc(&format!(
            "{}<h1>  Header   Name </h1>",
            ld(r#"{"@type":"BreadcrumbList","name":"Nope"}"#)
        ));
        let info = extract(&html);
        assert_eq!(info.name, "Header Name");
    }

    #[test]
    fn type_array_is_accepted() {
        let html = doc(&ld(r#"{"@type":["Thing","Restaurant"],"name":"Arrayed"}"#));
        assert_eq!(extract(&html).name, "Arrayed");
    }

    #[test]
    fn heading_fallback_when_no_ld_json() {
        let html = doc("<h2>Plain Bistro</h2>");
        assert_eq!(extract(&html).name, "Plain Bistro");
    }

    #[test]
    fn bubble_conversion() {
        let html = Html::parse_document(
            r#"<div><span class="ui_bubble_rating bubble_45"></span></div>"#,
        );
        let el = html
            .select(&Selector::parse("span").unwrap())
            .next()
            .unwrap();
        assert_eq!(bubble_rating(&el), Some(4.5));
    }

    #[test]
    fn bubble_zero_is_found_not_missing() {
        let html = Html::parse_document(
            r#"<div><span class="ui_bubble_rating bubble_0"></span><span class="plain"></span></div>"#,
        );
        let sel = Selector::parse("span").unwrap();
        let mut spans = html.select(&sel);
        assert_eq!(bubble_rating(&spans.next().unwrap()), Some(0.0));
        assert_eq!(bubble_rating(&spans.next().unwrap()), None);
    }

    #[test]
    fn overall_rating_from_bubble_when_no_ld_json() {
        let html = doc(r#"<span class="ui_bubble_rating bubble_40"></span>"#);
        assert_eq!(extract(&html).overall_rating, "4");
    }

    #[test]
    fn malformed_ld_json_is_skipped() {
        let html = doc(&ld("{not json"));
        let info = extract(&html);
        assert!(info.name.is_empty());
    }
}
