use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use tracing::info;

use crate::dataset::Dataset;

pub const TITLES_FILE: &str = "titles.txt";
pub const ARCHIVE_FILE: &str = "buzzfeed-quizzes.json";

static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap());

/// Decode the HTML entity references BuzzFeed titles carry: numeric
/// character references plus the common named ones. Anything
/// unrecognized passes through untouched.
pub fn decode_entities(s: &str) -> String {
    let s = NUMERIC_ENTITY_RE.replace_all(s, |caps: &Captures| {
        let body = &caps[1];
        let code = match body.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => body.parse::<u32>(),
        };
        match code.ok().and_then(char::from_u32) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    });
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

/// Write both run artifacts: the decoded title corpus and the JSON
/// archive the next run will load. Both are fresh overwrites.
pub fn write_outputs(dataset: &Dataset, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    let titles_path = out_dir.join(TITLES_FILE);
    let mut corpus = String::new();
    for title in dataset.titles() {
        corpus.push_str(&decode_entities(title));
        corpus.push('\n');
    }
    fs::write(&titles_path, corpus)
        .with_context(|| format!("Failed to write {}", titles_path.display()))?;

    let archive_path = out_dir.join(ARCHIVE_FILE);
    let archive = serde_json::to_string(dataset.items()).context("Failed to encode archive")?;
    fs::write(&archive_path, archive)
        .with_context(|| format!("Failed to write {}", archive_path.display()))?;

    info!(
        "Wrote {} titles to {} and {} quizzes to {}",
        dataset.titles().len(),
        titles_path.display(),
        dataset.len(),
        archive_path.display()
    );
    Ok(())
}
