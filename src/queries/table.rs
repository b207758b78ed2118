//! Title-keyed table of canned search queries.
//!
//! Keys are normalized aggressively (case, whitespace, punctuation,
//! common diacritics) so a table entry still matches when the activity
//! title drifts cosmetically. Every failure path degrades to a miss; the
//! caller falls back to searching the literal title.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

/// Wire shape of one remote table entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTableEntry {
    pub title: String,
    #[serde(default)]
    pub queries: Vec<String>,
}

#[derive(Debug, Default)]
pub struct QueryTable {
    entries: HashMap<String, Vec<String>>,
}

impl QueryTable {
    pub fn from_entries(entries: Vec<QueryTableEntry>) -> Self {
        let mut map = HashMap::new();
        for entry in entries {
            let key = normalize_title(&entry.title);
            if key.is_empty() || entry.queries.is_empty() {
                continue;
            }
            map.insert(key, entry.queries);
        }
        Self { entries: map }
    }

    /// Fetch the remote table. Any failure yields an empty table so the
    /// caller degrades to literal-title searches.
    pub async fn fetch(url: &str) -> Self {
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                warn!("query table client build failed: {}", e);
                return Self::default();
            }
        };

        let entries: Vec<QueryTableEntry> = match client.get(url).send().await {
            Ok(response) => match response.json().await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("query table at {} is malformed: {}", url, e);
                    return Self::default();
                }
            },
            Err(e) => {
                warn!("query table fetch from {} failed: {}", url, e);
                return Self::default();
            }
        };

        debug!("loaded {} query table entries", entries.len());
        Self::from_entries(entries)
    }

    pub fn lookup(&self, title: &str) -> Option<&[String]> {
        self.entries
            .get(&normalize_title(title))
            .map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lowercase, strip whitespace and punctuation, fold common Latin-1
/// diacritics to their base letter.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_ascii_punctuation())
        .flat_map(|c| c.to_lowercase())
        .map(fold_diacritic)
        .collect()
}

fn fold_diacritic(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}
