//! Line-indexed content of files that are not open in the editor.
//!
//! Goto-definition on a concept needs the length of the concept's heading
//! line to build a whole-line range.  When the `.cpt` file is not open the
//! file is read from disk and its lines are kept here, keyed by URI.
//!
//! Entries are never evicted; a later `add` for the same URI replaces the
//! previous lines (last write wins).
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Shared, internally synchronized cache of file lines keyed by URI.
#[derive(Debug, Clone, Default)]
pub struct LineCache {
    files: Arc<RwLock<HashMap<String, Vec<String>>>>,
}

impl LineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `contents` for `uri`, split on `\n` (a trailing `\r` is
    /// dropped), replacing any lines stored before.
    pub fn add(&self, uri: &str, contents: &str) {
        let lines = contents.lines().map(str::to_string).collect();
        self.files.write().insert(uri.to_string(), lines);
    }

    /// Text of the zero-based line `index` of `uri`.
    ///
    /// Returns an empty string when the URI is unknown or the index is out
    /// of range; callers only need the length.
    pub fn line(&self, uri: &str, index: usize) -> String {
        self.files
            .read()
            .get(uri)
            .and_then(|lines| lines.get(index))
            .cloned()
            .unwrap_or_default()
    }

    /// Whether anything is stored for `uri`.
    pub fn contains(&self, uri: &str) -> bool {
        self.files.read().contains_key(uri)
    }
}
