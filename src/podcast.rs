// src/podcast.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// === ITEM IDENTIFIERS ===

/// Opaque identifier of a togglable item. Integers and strings are both accepted
/// and kept as text, since that is how they travel through markup and URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawItemId", into = "String")]
pub struct ItemId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawItemId {
    Number(u64),
    Text(String),
}

impl From<RawItemId> for ItemId {
    fn from(raw: RawItemId) -> Self {
        match raw {
            RawItemId::Number(n) => ItemId(n.to_string()),
            RawItemId::Text(s) => ItemId(s),
        }
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl ItemId {
    pub fn new(s: &str) -> Self {
        ItemId(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<u64> for ItemId {
    fn from(n: u64) -> Self {
        ItemId(n.to_string())
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId::new(s)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// === EPISODE / PODCAST ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    #[serde(rename = "id")]
    id: ItemId,
    #[serde(rename = "title")]
    title: String,
    // seconds
    #[serde(rename = "duration", default)]
    duration: u64,
    #[serde(rename = "published_on")]
    published_on: DateTime<Utc>,
    #[serde(rename = "listened", default)]
    listened: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Podcast {
    #[serde(rename = "collection_id")]
    collection_id: ItemId,
    #[serde(rename = "name")]
    name: String,
    #[serde(rename = "subscribed", default)]
    subscribed: bool,
}

impl Episode {
    pub fn new(
        id: ItemId,
        title: String,
        duration: u64,
        published_on: DateTime<Utc>,
        listened: bool,
    ) -> Self {
        Self { id, title, duration, published_on, listened }
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn published_on(&self) -> DateTime<Utc> {
        self.published_on
    }

    pub fn listened(&self) -> bool {
        self.listened
    }
}

impl Podcast {
    pub fn new(collection_id: ItemId, name: String, subscribed: bool) -> Self {
        Self { collection_id, name, subscribed }
    }

    pub fn collection_id(&self) -> &ItemId {
        &self.collection_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscribed(&self) -> bool {
        self.subscribed
    }
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Title       : {}", self.title)?;
        writeln!(f, "ID          : {}", self.id)?;
        writeln!(f, "Duration    : {}s", self.duration)?;
        writeln!(f, "Published   : {}", self.published_on)?;
        writeln!(f, "Listened    : {}", self.listened)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_id_accepts_numbers_and_strings() {
        let from_number: ItemId = serde_json::from_str("42").unwrap();
        let from_text: ItemId = serde_json::from_str("\"E7\"").unwrap();

        assert_eq!(from_number, ItemId::from(42));
        assert_eq!(from_text.as_str(), "E7");
        assert_eq!(serde_json::to_string(&from_number).unwrap(), "\"42\"");
    }

    #[test]
    fn episode_defaults_missing_flags() {
        let json = r#"{"id": 3, "title": "Pilot", "published_on": "2020-05-01T10:00:00Z"}"#;
        let episode: Episode = serde_json::from_str(json).unwrap();

        assert_eq!(episode.id().as_str(), "3");
        assert_eq!(episode.duration(), 0);
        assert!(!episode.listened());
    }
}
