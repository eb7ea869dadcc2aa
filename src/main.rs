mod config;
mod fetch;
mod merge;
mod output;
mod parser;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use config::Config;
use output::BusinessInfo;

#[derive(Parser)]
#[command(
    name = "review_scraper",
    about = "Extract reviews from saved or fetched listing pages into JSON + CSV"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse one saved listing page
    Parse {
        /// Input HTML file (default: listing.html)
        input: Option<PathBuf>,
    },
    /// Parse and merge every saved listing page
    Merge {
        /// Directory of extra saved pages (default: pages/)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Fetch listing pages, then parse and merge them
    Fetch {
        /// URL of the first listing page
        url: String,
        /// Number of consecutive pages to fetch
        #[arg(short = 'n', long, default_value = "3")]
        pages: usize,
        /// Seconds to pause between requests
        #[arg(long)]
        delay: Option<u64>,
        /// Where fetched pages are saved (default: pages/)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { input } => run_parse(&Config::default(), input),
        Commands::Merge { dir } => run_merge(&Config::default(), dir),
        Commands::Fetch {
            url,
            pages,
            delay,
            out_dir,
        } => {
            let mut cfg = Config::default();
            if let Some(secs) = delay {
                cfg.fetch_delay = Duration::from_secs(secs);
            }
            if let Some(dir) = out_dir {
                cfg.pages_dir = dir;
            }
            run_fetch(&cfg, &url, pages).await
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn run_parse(cfg: &Config, input: Option<PathBuf>) -> Result<()> {
    let path = input.unwrap_or_else(|| cfg.input.clone());
    if !path.exists() {
        bail!("Input file not found: {}", path.display());
    }

    let raw = read_lossy(&path)?;
    let extraction = parser::extract_document(&raw);
    if let Some(strategy) = extraction.strategy {
        info!("{}: {} reviews ({})", path.display(), extraction.reviews.len(), strategy.name());
    }

    let reviews = merge::dedupe_and_sort(extraction.reviews);
    let business = nonempty(extraction.business);
    output::write_outputs(&cfg.parse_json, &cfg.parse_csv, &reviews, business.as_ref())?;

    println!(
        "Parsed {} reviews → {}, {}",
        reviews.len(),
        cfg.parse_csv.display(),
        cfg.parse_json.display()
    );
    if reviews.len() < 5 {
        println!("Note: fewer than 5 reviews; save more listing pages and run merge.");
    }
    Ok(())
}

fn run_merge(cfg: &Config, dir: Option<PathBuf>) -> Result<()> {
    let pages_dir = dir.unwrap_or_else(|| cfg.pages_dir.clone());

    let mut files: Vec<PathBuf> = Vec::new();
    let mut candidates = vec![cfg.input.clone()];
    candidates.extend(cfg.extra_inputs.iter().cloned());
    for path in candidates {
        if path.exists() {
            files.push(path);
        } else {
            warn!("Skipping missing input {}", path.display());
        }
    }
    if pages_dir.exists() {
        let mut extra: Vec<PathBuf> = std::fs::read_dir(&pages_dir)
            .with_context(|| format!("Failed to read {}", pages_dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "html"))
            .collect();
        extra.sort();
        files.extend(extra);
    }

    if files.is_empty() {
        bail!(
            "No HTML files found. Save a listing page as {} or put pages under {}/",
            cfg.input.display(),
            pages_dir.display()
        );
    }

    println!("Reading {} files:", files.len());
    for f in &files {
        println!("   - {}", f.display());
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len}")?
            .progress_chars("=> "),
    );

    let mut all_reviews = Vec::new();
    let mut business: Option<BusinessInfo> = None;
    for path in &files {
        let raw = read_lossy(path)?;
        let extraction = parser::extract_document(&raw);
        let strategy = extraction.strategy.map(parser::Strategy::name).unwrap_or("none");
        info!("{}: {} reviews ({})", path.display(), extraction.reviews.len(), strategy);
        all_reviews.extend(extraction.reviews);
        if business.is_none() {
            business = nonempty(extraction.business);
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let reviews = merge::dedupe_and_sort(all_reviews);
    println!("Total unique reviews: {}", reviews.len());

    output::write_outputs(&cfg.merge_json, &cfg.merge_csv, &reviews, business.as_ref())?;
    println!("Wrote {} and {}", cfg.merge_json.display(), cfg.merge_csv.display());
    if reviews.len() < 15 {
        println!(
            "Note: fewer than 15 reviews. Save additional offset pages next to {}",
            cfg.input.display()
        );
        println!("   or put extra files under {}/ and rerun.", pages_dir.display());
    }
    Ok(())
}

async fn run_fetch(cfg: &Config, url: &str, pages: usize) -> Result<()> {
    let fetched = fetch::fetch_listing_pages(cfg, url, pages).await?;
    let ok = fetched.iter().filter(|p| p.html.is_some()).count();
    println!("Fetched {}/{} pages → {}/", ok, fetched.len(), cfg.pages_dir.display());

    let mut all_reviews = Vec::new();
    let mut business: Option<BusinessInfo> = None;
    for page in &fetched {
        let Some(html) = &page.html else { continue };
        let extraction = parser::extract_document(html);
        let strategy = extraction.strategy.map(parser::Strategy::name).unwrap_or("none");
        info!("start={}: {} reviews ({})", page.offset, extraction.reviews.len(), strategy);
        all_reviews.extend(extraction.reviews);
        if business.is_none() {
            business = nonempty(extraction.business);
        }
    }

    let reviews = merge::dedupe_and_sort(all_reviews);
    output::write_outputs(&cfg.merge_json, &cfg.merge_csv, &reviews, business.as_ref())?;
    println!(
        "Wrote {} and {} ({} reviews)",
        cfg.merge_json.display(),
        cfg.merge_csv.display(),
        reviews.len()
    );
    Ok(())
}

/// Saved pages occasionally carry stray bytes; decode what we can.
fn read_lossy(path: &std::path::Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn nonempty(business: BusinessInfo) -> Option<BusinessInfo> {
    if business.is_empty() {
        None
    } else {
        Some(business)
    }
}
