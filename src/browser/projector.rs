//! Projects a flat key listing onto the entries visible under one prefix.

use crate::models::namespace::{DELIMITER, Entry, KeySet, Prefix};
use std::collections::HashSet;

/// Compute the immediate children of `prefix`.
///
/// Keys outside the prefix are skipped, as is a key equal to the prefix
/// itself (a folder marker object maps to no visible name). Anything with a
/// further delimiter collapses into a folder named by its first segment plus
/// the delimiter; the rest are leaves. Output is in scan order and unique by
/// name.
pub fn project(keys: &KeySet, prefix: &Prefix) -> Vec<Entry> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut entries = Vec::new();

    for key in keys.iter() {
        let Some(relative) = key.strip_prefix(prefix.as_str()) else {
            continue;
        };
        if relative.is_empty() {
            continue;
        }

        let entry_name = match relative.find(DELIMITER) {
            // Folder names keep their trailing delimiter.
            Some(idx) => &relative[..idx + DELIMITER.len_utf8()],
            None => relative,
        };
        if !seen.insert(entry_name) {
            continue;
        }

        let is_folder = entry_name.ends_with(DELIMITER);
        entries.push(Entry {
            name: entry_name.to_string(),
            is_folder,
        });
    }

    entries
}

/// True when `name` is a folder entry directly under `prefix`.
pub fn has_folder(keys: &KeySet, prefix: &Prefix, name: &str) -> bool {
    project(keys, prefix)
        .iter()
        .any(|entry| entry.is_folder && entry.name == name)
}

/// True when `name` is a leaf entry directly under `prefix`.
pub fn has_leaf(keys: &KeySet, prefix: &Prefix, name: &str) -> bool {
    if name.is_empty() || name.contains(DELIMITER) {
        return false;
    }
    keys.contains(&format!("{}{}", prefix, name))
}
