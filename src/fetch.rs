use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;

/// Listing pagination step: review sites page by record offset, ten per page.
const PAGE_STEP: usize = 10;

/// One fetched listing page. `html` is `None` when the request failed; that
/// page then contributes nothing and the run carries on.
pub struct FetchedPage {
    pub offset: usize,
    pub html: Option<String>,
}

/// Fetch `pages` consecutive listing pages strictly in sequence, pausing
/// between requests. Every successful body is also saved under the pages
/// directory so the run can be repeated offline with `merge`. No retries.
pub async fn fetch_listing_pages(cfg: &Config, base_url: &str, pages: usize) -> Result<Vec<FetchedPage>> {
    let client = reqwest::Client::builder()
        .user_agent(cfg.user_agent.clone())
        .build()
        .context("Failed to build HTTP client")?;

    std::fs::create_dir_all(&cfg.pages_dir)
        .with_context(|| format!("Failed to create {}", cfg.pages_dir.display()))?;

    let mut fetched = Vec::with_capacity(pages);
    for page in 0..pages {
        if page > 0 {
            tokio::time::sleep(cfg.fetch_delay).await;
        }

        let offset = page * PAGE_STEP;
        let url = page_url(base_url, offset);
        info!("Fetching {}", url);

        match fetch_one(&client, &url).await {
            Ok(body) => {
                let path = cfg.pages_dir.join(format!("page_{offset}.html"));
                std::fs::write(&path, &body)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                fetched.push(FetchedPage {
                    offset,
                    html: Some(body),
                });
            }
            Err(e) => {
                warn!("Fetch failed for {}: {}", url, e);
                fetched.push(FetchedPage { offset, html: None });
            }
        }
    }

    Ok(fetched)
}

async fn fetch_one(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

fn page_url(base: &str, offset: usize) -> String {
    if offset == 0 {
        return base.to_string();
    }
    if base.contains('?') {
        format!("{base}&start={offset}")
    } else {
        format!("{base}?start={offset}")
    }
}
