use std::collections::HashSet;
use std::path::Path;
use std::{fs, io};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;

/// The working set for one harvest run: dedup index, English-title
/// projection, incremental watermark, and the full archive in
/// discovery order. Append-only; invariants are upheld by [`insert`].
///
/// [`insert`]: Dataset::insert
#[derive(Debug, Default)]
pub struct Dataset {
    seen_ids: HashSet<String>,
    titles: Vec<String>,
    latest_seen: Option<DateTime<Utc>>,
    items: Vec<Value>,
}

impl Dataset {
    /// Load the archive written by a previous run. A missing file is a
    /// first run and yields an empty dataset; a file that exists but
    /// cannot be parsed into well-formed items is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let mut dataset = Dataset::default();

        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No previous archive at {}, starting fresh", path.display());
                return Ok(dataset);
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read archive {}", path.display()));
            }
        };

        let items: Vec<Value> = serde_json::from_str(&raw)
            .with_context(|| format!("Malformed archive {}", path.display()))?;
        for item in items {
            dataset
                .insert(item)
                .with_context(|| format!("Bad item in archive {}", path.display()))?;
        }

        info!("Previous data loaded: {} quizzes", dataset.items.len());
        if let Some(seen) = dataset.latest_seen {
            info!(
                "Date of latest previously loaded quiz: {}",
                seen.to_rfc3339()
            );
        }
        Ok(dataset)
    }

    /// Merge one item. Returns `true` if the item was new; an already
    /// known id leaves the dataset untouched. New items land in the
    /// archive, advance the watermark, and (when `language == "en"`)
    /// contribute their title to the corpus.
    pub fn insert(&mut self, item: Value) -> Result<bool> {
        let id = item_id(&item)?;
        if self.seen_ids.contains(&id) {
            return Ok(false);
        }

        // All required fields are read before any state changes.
        let published = item_published(&item)?;
        let title = match item_language(&item)? {
            "en" => Some(item_title(&item)?.to_string()),
            _ => None,
        };

        self.seen_ids.insert(id);
        if self.latest_seen.map_or(true, |seen| published > seen) {
            self.latest_seen = Some(published);
        }
        self.titles.extend(title);
        self.items.push(item);
        Ok(true)
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.seen_ids.contains(id)
    }

    /// Watermark: publication time of the newest item seen so far.
    pub fn latest_seen(&self) -> Option<DateTime<Utc>> {
        self.latest_seen
    }

    /// English titles in discovery order, entities still encoded.
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// Every archived item in insertion order.
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Canonical string form of an item's `id`. The feed serves numeric
/// ids but the archive may round-trip them as strings; both map to the
/// same key.
pub fn item_id(item: &Value) -> Result<String> {
    match item.get("id") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => bail!("item \"id\" is neither string nor number: {other}"),
        None => bail!("item missing \"id\""),
    }
}

/// Publication time from the `published` field: epoch seconds, given
/// as an integer or a numeric string.
pub fn item_published(item: &Value) -> Result<DateTime<Utc>> {
    let raw = item.get("published").context("item missing \"published\"")?;
    let secs = match raw {
        Value::Number(n) => n
            .as_i64()
            .with_context(|| format!("item \"published\" is not an integer: {n}"))?,
        Value::String(s) => s
            .parse::<i64>()
            .with_context(|| format!("item \"published\" is not epoch seconds: {s:?}"))?,
        other => bail!("item \"published\" is neither number nor string: {other}"),
    };
    DateTime::from_timestamp(secs, 0)
        .with_context(|| format!("item \"published\" out of range: {secs}"))
}

pub fn item_language(item: &Value) -> Result<&str> {
    item.get("language")
        .and_then(Value::as_str)
        .context("item missing \"language\"")
}

fn item_title(item: &Value) -> Result<&str> {
    item.get("title")
        .and_then(Value::as_str)
        .context("item missing \"title\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quiz(id: i64, published: i64, language: &str, title: &str) -> Value {
        json!({
            "id": id,
            "published": published,
            "language": language,
            "title": title,
        })
    }

    #[test]
    fn insert_tracks_ids_titles_and_watermark() {
        let mut ds = Dataset::default();
        assert!(ds.insert(quiz(1, 1000, "en", "First")).unwrap());
        assert!(ds.insert(quiz(2, 3000, "es", "Segundo")).unwrap());
        assert!(ds.insert(quiz(3, 2000, "en", "Third")).unwrap());

        assert_eq!(ds.len(), 3);
        assert_eq!(ds.titles(), ["First", "Third"]);
        assert_eq!(ds.latest_seen().unwrap().timestamp(), 3000);
        assert!(ds.is_known("2"));
    }

    #[test]
    fn insert_skips_known_ids() {
        let mut ds = Dataset::default();
        assert!(ds.insert(quiz(7, 1000, "en", "Once")).unwrap());
        assert!(!ds.insert(quiz(7, 5000, "en", "Again")).unwrap());

        assert_eq!(ds.len(), 1);
        assert_eq!(ds.titles(), ["Once"]);
        // The duplicate never merged, so it cannot move the watermark.
        assert_eq!(ds.latest_seen().unwrap().timestamp(), 1000);
    }

    #[test]
    fn numeric_and_string_ids_share_a_key() {
        let mut ds = Dataset::default();
        assert!(ds.insert(quiz(42, 1000, "en", "Num")).unwrap());
        assert!(!ds
            .insert(json!({"id": "42", "published": 2000, "language": "en", "title": "Str"}))
            .unwrap());
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn published_coerces_from_string() {
        let item = json!({"id": 1, "published": "1500", "language": "en", "title": "T"});
        assert_eq!(item_published(&item).unwrap().timestamp(), 1500);
    }

    #[test]
    fn missing_fields_are_errors() {
        let mut ds = Dataset::default();
        assert!(ds.insert(json!({"published": 1, "language": "en", "title": "T"})).is_err());
        assert!(ds.insert(json!({"id": 1, "language": "en", "title": "T"})).is_err());
        assert!(ds.insert(json!({"id": 2, "published": 1, "title": "T"})).is_err());
        assert!(ds.insert(json!({"id": 3, "published": 1, "language": "en"})).is_err());
    }

    #[test]
    fn missing_title_only_matters_for_english() {
        let mut ds = Dataset::default();
        assert!(ds
            .insert(json!({"id": 1, "published": 1, "language": "ja"}))
            .unwrap());
        assert_eq!(ds.len(), 1);
        assert!(ds.titles().is_empty());
    }

    #[test]
    fn load_missing_file_is_a_fresh_start() {
        let dir = tempfile::tempdir().unwrap();
        let ds = Dataset::load(&dir.path().join("nothing-here.json")).unwrap();
        assert!(ds.is_empty());
        assert!(ds.latest_seen().is_none());
    }

    #[test]
    fn load_populates_the_working_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.json");
        let archive = json!([
            quiz(1, 1000, "en", "A &amp; B"),
            quiz(2, 2000, "fr", "Ç"),
        ]);
        std::fs::write(&path, archive.to_string()).unwrap();

        let ds = Dataset::load(&path).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.titles(), ["A &amp; B"]);
        assert_eq!(ds.latest_seen().unwrap().timestamp(), 2000);
        assert!(ds.is_known("1") && ds.is_known("2"));
    }

    #[test]
    fn load_rejects_malformed_archives() {
        let dir = tempfile::tempdir().unwrap();

        let garbled = dir.path().join("garbled.json");
        std::fs::write(&garbled, "[{not json").unwrap();
        assert!(Dataset::load(&garbled).is_err());

        let incomplete = dir.path().join("incomplete.json");
        std::fs::write(&incomplete, r#"[{"id": 1, "language": "en", "title": "T"}]"#).unwrap();
        assert!(Dataset::load(&incomplete).is_err());
    }
}
