//! State types for tracking sync progress
//!
//! Serialized in the Singer layout and persisted between runs:
//!
//! ```json
//! {"bookmarks": {"orders": {"replication_key": "updateTime",
//!                           "replication_key_value": "2024-05-01T00:00:00Z"}}}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete state for the tap
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Per-stream bookmarks
    #[serde(default)]
    pub bookmarks: BTreeMap<String, Bookmark>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the bookmark for a stream
    pub fn get_bookmark(&self, stream: &str) -> Option<&Bookmark> {
        self.bookmarks.get(stream)
    }

    /// Bookmarked replication value for a stream
    pub fn bookmark_value(&self, stream: &str) -> Option<&str> {
        self.bookmarks
            .get(stream)
            .map(|b| b.replication_key_value.as_str())
    }

    /// Record a stream's bookmark, replacing any previous one
    pub fn set_bookmark(
        &mut self,
        stream: &str,
        replication_key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.bookmarks.insert(
            stream.to_string(),
            Bookmark {
                replication_key: replication_key.into(),
                replication_key_value: value.into(),
            },
        );
    }

    /// Drop a stream's bookmark
    pub fn clear_bookmark(&mut self, stream: &str) -> Option<Bookmark> {
        self.bookmarks.remove(stream)
    }
}

/// Replication progress of one stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Field the value was taken from
    pub replication_key: String,
    /// Largest value seen in the last successful run
    pub replication_key_value: String,
}
