use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

/// Column order of the CSV output. Missing fields are written as "".
pub const CSV_HEADER: [&str; 10] = [
    "review_id",
    "reviewer",
    "stars",
    "date_local",
    "title",
    "text",
    "business_name",
    "overall_rating",
    "total_review_count",
    "priceRange",
];

/// One extracted review. `stars` keeps whatever the source carried: a JSON
/// number from the embedded cache, a decimal string from an aria-label, a
/// float from a bubble class, or null when nothing was found.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewRecord {
    pub review_id: String,
    pub reviewer: String,
    pub stars: Value,
    pub date_local: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
}

impl ReviewRecord {
    /// Dedupe key: explicit id when present, else reviewer + date composite.
    pub fn identity(&self) -> String {
        if !self.review_id.is_empty() {
            self.review_id.clone()
        } else {
            format!("{}|{}", self.reviewer, self.date_local)
        }
    }

    fn stars_cell(&self) -> String {
        match &self.stars {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Business metadata from JSON-LD (plus heading/bubble fallbacks), flattened
/// onto every CSV row and kept as one object in the JSON output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BusinessInfo {
    pub name: String,
    pub overall_rating: String,
    pub total_review_count: String,
    #[serde(rename = "priceRange")]
    pub price_range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl BusinessInfo {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.overall_rating.is_empty()
            && self.total_review_count.is_empty()
            && self.price_range.is_empty()
            && self.category.is_none()
            && self.city.is_none()
    }
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    business: Option<&'a BusinessInfo>,
    count: usize,
    reviews: &'a [ReviewRecord],
}

/// Write both output files, truncating whatever was there before.
pub fn write_outputs(
    json_path: &Path,
    csv_path: &Path,
    reviews: &[ReviewRecord],
    business: Option<&BusinessInfo>,
) -> Result<()> {
    let doc = JsonDocument {
        business,
        count: reviews.len(),
        reviews,
    };
    let mut json = serde_json::to_string_pretty(&doc).context("Failed to serialize JSON output")?;
    json.push('\n');
    std::fs::write(json_path, json)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;

    let mut writer = csv::Writer::from_path(csv_path)
        .with_context(|| format!("Failed to write {}", csv_path.display()))?;
    writer.write_record(CSV_HEADER)?;

    let empty = BusinessInfo::default();
    let biz = business.unwrap_or(&empty);
    for r in reviews {
        writer.write_record([
            r.review_id.clone(),
            r.reviewer.clone(),
            r.stars_cell(),
            r.date_local.clone(),
            r.title.clone().unwrap_or_default(),
            r.text.clone(),
            biz.name.clone(),
            biz.overall_rating.clone(),
            biz.total_review_count.clone(),
            biz.price_range.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, reviewer: &str, stars: Value, date: &str, text: &str) -> ReviewRecord {
        ReviewRecord {
            review_id: id.to_string(),
            reviewer: reviewer.to_string(),
            stars,
            date_local: date.to_string(),
            title: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn identity_prefers_explicit_id() {
        let r = record("abc", "Alex", json!(5), "2024-01-02", "ok");
        assert_eq!(r.identity(), "abc");
    }

    #[test]
    fn identity_falls_back_to_reviewer_and_date() {
        let r = record("", "Alex", json!(5), "2024-01-02", "ok");
        assert_eq!(r.identity(), "Alex|2024-01-02");
    }

    #[test]
    fn stars_cell_renders_each_shape() {
        assert_eq!(record("", "", json!(5), "", "t").stars_cell(), "5");
        assert_eq!(record("", "", json!(4.5), "", "t").stars_cell(), "4.5");
        assert_eq!(record("", "", json!("4,5 étoiles".to_string()), "", "t").stars_cell(), "4,5 étoiles");
        assert_eq!(record("", "", Value::Null, "", "t").stars_cell(), "");
    }

    #[test]
    fn json_output_keeps_count_and_non_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("out.json");
        let csv_path = dir.path().join("out.csv");
        let reviews = vec![record("r1", "Amélie", json!(4), "2024-03-01", "Très bon café")];
        write_outputs(&json_path, &csv_path, &reviews, None).unwrap();

        let raw = std::fs::read_to_string(&json_path).unwrap();
        assert!(raw.contains("Très bon café"), "non-ASCII must be preserved: {raw}");
        let doc: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["count"], json!(1));
        assert_eq!(doc["reviews"][0]["stars"], json!(4));
        assert!(doc.get("business").is_none());
    }

    #[test]
    fn empty_run_still_writes_count_zero() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("out.json");
        let csv_path = dir.path().join("out.csv");
        write_outputs(&json_path, &csv_path, &[], None).unwrap();

        let doc: Value = serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(doc["count"], json!(0));
        assert_eq!(doc["reviews"], json!([]));

        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(csv.lines().count(), 1, "header only");
        assert!(csv.starts_with("review_id,reviewer,stars,date_local"));
    }

    #[test]
    fn csv_flattens_business_onto_rows() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("out.json");
        let csv_path = dir.path().join("out.csv");
        let biz = BusinessInfo {
            name: "Chez Paul".to_string(),
            overall_rating: "4.5".to_string(),
            total_review_count: "128".to_string(),
            price_range: "$$".to_string(),
            category: None,
            city: None,
        };
        let reviews = vec![record("r1", "Alex", Value::Null, "2024-01-02", "Great food!")];
        write_outputs(&json_path, &csv_path, &reviews, Some(&biz)).unwrap();

        let csv = std::fs::read_to_string(&csv_path).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(row, "r1,Alex,,2024-01-02,,Great food!,Chez Paul,4.5,128,$$");
    }
}
