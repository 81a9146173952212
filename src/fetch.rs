use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::dataset::{item_id, item_language, item_published, Dataset};
use crate::feed::FeedSource;

/// Paging bounds for one harvest run. `end_page` and `max_pages`
/// default to unbounded.
pub struct FetchOptions {
    pub start_page: u32,
    pub end_page: Option<u32>,
    pub max_pages: Option<u32>,
}

/// Totals reported after the fetch loop finishes.
pub struct FetchStats {
    pub pages: u32,
    pub examined: usize,
    pub added: usize,
}

/// Walk the feed from `start_page` upward, merging each page into the
/// dataset, until the feed runs dry, a page bound is hit, or a page
/// holds nothing newer than the previous run.
///
/// The watermark cutoff is snapshotted once on entry: items merged
/// during this run advance `dataset.latest_seen()` but never the
/// cutoff the stop comparison uses. The comparison also runs only
/// after a page is fully merged, so a page straddling the cutoff is
/// still captured whole.
pub fn fetch_new(
    dataset: &mut Dataset,
    feed: &impl FeedSource,
    opts: &FetchOptions,
) -> Result<FetchStats> {
    let cutoff = dataset.latest_seen();

    let mut stats = FetchStats {
        pages: 0,
        examined: 0,
        added: 0,
    };
    let mut page = opts.start_page;

    loop {
        if opts.max_pages.is_some_and(|max| stats.pages >= max) {
            info!("Page limit reached after {} pages", stats.pages);
            break;
        }
        if let Some(end) = opts.end_page {
            if page > end {
                info!("End page {end} reached");
                break;
            }
        }

        let items = feed.fetch_page(page)?;
        stats.pages += 1;
        if items.is_empty() {
            info!("Page {page} is empty, end of feed");
            break;
        }

        let mut latest_on_page: Option<DateTime<Utc>> = None;
        for item in items {
            stats.examined += 1;
            let published = item_published(&item)?;
            if latest_on_page.map_or(true, |seen| published > seen) {
                latest_on_page = Some(published);
            }

            if dataset.is_known(&item_id(&item)?) {
                continue;
            }
            let is_english = item_language(&item)? == "en";
            if dataset.insert(item)? && is_english {
                stats.added += 1;
            }
        }

        if let Some(latest) = latest_on_page {
            info!("Read page {page}: {}", latest.to_rfc3339());
            if cutoff.is_some_and(|cutoff| latest <= cutoff) {
                info!("Page {page} holds nothing newer than the last run, stopping");
                break;
            }
        }

        page += 1;
    }

    Ok(stats)
}
