//! Value types for the virtual folder hierarchy laid over a flat key space.
//!
//! Object keys carry no real directory structure. A single reserved
//! delimiter (`/`) inside a key marks a virtual folder boundary, and a
//! [`Prefix`] names the folder currently being viewed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Reserved character that separates virtual folder segments inside a key.
pub const DELIMITER: char = '/';

/// Opaque identifier of one stored object within a bucket.
pub type ObjectKey = String;

/// The full, deduplicated key listing of one bucket.
///
/// Iteration is lexicographic, which gives the projector a stable scan order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeySet(BTreeSet<ObjectKey>);

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<ObjectKey>> FromIterator<S> for KeySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// The folder a user is looking at: either empty (bucket root) or a string
/// ending with [`DELIMITER`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Prefix(String);

impl Prefix {
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Accepts `""` or any delimiter-terminated string.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() || raw.ends_with(DELIMITER) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Descend into a folder entry. `folder_name` must itself end with the
    /// delimiter (folder entries always do).
    pub fn child(&self, folder_name: &str) -> Option<Self> {
        if !folder_name.ends_with(DELIMITER) {
            return None;
        }
        Some(Self(format!("{}{}", self.0, folder_name)))
    }

    /// The enclosing folder, or `None` when already at the root.
    ///
    /// Only the final segment is dropped, so empty segments produced by
    /// consecutive delimiters survive and `child` followed by `parent` always
    /// lands back where it started.
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.0.strip_suffix(DELIMITER)?;
        let parent = match trimmed.rfind(DELIMITER) {
            Some(idx) => trimmed[..=idx].to_string(),
            None => String::new(),
        };
        Some(Self(parent))
    }

    pub fn delimiter_count(&self) -> usize {
        self.0.matches(DELIMITER).count()
    }

    /// Segments between delimiters, without the empty tail produced by the
    /// terminating delimiter. Empty inner segments are preserved.
    pub fn segments(&self) -> Vec<&str> {
        match self.0.strip_suffix(DELIMITER) {
            Some(trimmed) => trimmed.split(DELIMITER).collect(),
            None => Vec::new(),
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One child visible directly under a prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Path segment; folders keep their trailing delimiter.
    pub name: String,
    pub is_folder: bool,
}

impl Entry {
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_folder: true,
        }
    }

    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_folder: false,
        }
    }
}

/// A clickable step in the trail from the bucket root to the current prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breadcrumb {
    pub label: String,
    pub target_prefix: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_parse_requires_trailing_delimiter() {
        assert_eq!(Prefix::parse(""), Some(Prefix::root()));
        assert!(Prefix::parse("logs/").is_some());
        assert!(Prefix::parse("logs").is_none());
        assert!(Prefix::parse("logs/2024").is_none());
    }

    #[test]
    fn parent_drops_last_segment_only() {
        let p = Prefix::parse("logs/2024/").unwrap();
        assert_eq!(p.parent().unwrap().as_str(), "logs/");
        assert_eq!(p.parent().unwrap().parent().unwrap(), Prefix::root());
        assert_eq!(Prefix::root().parent(), None);
    }

    #[test]
    fn parent_keeps_empty_inner_segments() {
        let p = Prefix::parse("a/").unwrap().child("/").unwrap();
        assert_eq!(p.as_str(), "a//");
        assert_eq!(p.segments(), vec!["a", ""]);
        assert_eq!(p.parent().unwrap().as_str(), "a/");
    }

    #[test]
    fn child_rejects_leaf_names() {
        assert!(Prefix::root().child("photo.png").is_none());
        assert_eq!(Prefix::root().child("logs/").unwrap().as_str(), "logs/");
    }

    #[test]
    fn key_set_collapses_duplicates() {
        let keys: KeySet = ["b", "a", "b"].into_iter().collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn entry_serializes_with_camel_case_flag() {
        let json = serde_json::to_value(Entry::folder("logs/")).unwrap();
        assert_eq!(json, serde_json::json!({"name": "logs/", "isFolder": true}));
    }
}
