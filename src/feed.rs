use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

const FEED_URL: &str = "https://www.buzzfeed.com/api/v2/feeds/quiz";
const USER_AGENT: &str = concat!("quiz-harvester/", env!("CARGO_PKG_VERSION"));
const FETCH_TIMEOUT_SECS: u64 = 30;

/// One unit of remote pagination: a 1-based page number in, that
/// page's item list out. The fetch loop only sees this trait, so it
/// runs against an in-memory feed in tests.
pub trait FeedSource {
    fn fetch_page(&self, page: u32) -> Result<Vec<Value>>;
}

/// Response envelope of the quiz feed endpoint. Items stay opaque;
/// only the envelope key is required.
#[derive(Deserialize)]
struct FeedResponse {
    buzzes: Vec<Value>,
}

/// The real feed, one blocking GET per page.
pub struct HttpFeed {
    client: reqwest::blocking::Client,
}

impl HttpFeed {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl FeedSource for HttpFeed {
    fn fetch_page(&self, page: u32) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(FEED_URL)
            .query(&[("p", page)])
            .send()
            .with_context(|| format!("Failed to fetch feed page {page}"))?
            .error_for_status()
            .with_context(|| format!("Feed page {page} returned an error status"))?;

        let envelope: FeedResponse = response
            .json()
            .with_context(|| format!("Malformed feed response for page {page}"))?;
        Ok(envelope.buzzes)
    }
}
