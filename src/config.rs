use std::path::PathBuf;
use std::time::Duration;

/// Run configuration. Every path and knob the original one-shot jobs kept as
/// top-of-file constants lives here; CLI arguments override individual fields.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default input for `parse` when no positional path is given.
    pub input: PathBuf,
    /// Offset-paginated sibling pages picked up by `merge` when present.
    pub extra_inputs: Vec<PathBuf>,
    /// Extra saved pages (`*.html`), merged in sorted filename order.
    pub pages_dir: PathBuf,
    /// Outputs for `parse`.
    pub parse_json: PathBuf,
    pub parse_csv: PathBuf,
    /// Outputs for `merge` and `fetch`.
    pub merge_json: PathBuf,
    pub merge_csv: PathBuf,
    /// Courtesy pause between sequential fetches. Not a rate limiter.
    pub fetch_delay: Duration,
    /// Browser-like User-Agent; review sites serve bot UAs a stub page.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("listing.html"),
            extra_inputs: vec![
                PathBuf::from("listing_10.html"),
                PathBuf::from("listing_20.html"),
            ],
            pages_dir: PathBuf::from("pages"),
            parse_json: PathBuf::from("parsed.json"),
            parse_csv: PathBuf::from("parsed.csv"),
            merge_json: PathBuf::from("data.json"),
            merge_csv: PathBuf::from("data.csv"),
            fetch_delay: Duration::from_secs(2),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                         AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}
