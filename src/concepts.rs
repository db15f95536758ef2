/// The concept dictionary.
///
/// Maps a concept's canonical value (e.g. `Login as {}`) to the file and
/// heading line that declare it.  Several files may declare the same value;
/// the earliest indexed declaration wins until its file drops it.  Populated from `.cpt` files when the
/// server starts and refreshed whenever a concept file is opened, edited,
/// or saved.
///
/// The dictionary is shared by every request and synchronizes internally;
/// goto-definition only reads from it.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ignore::WalkBuilder;
use parking_lot::RwLock;

use crate::parser::{self, ParseError};
use crate::types::ConceptInfo;
use crate::util::is_concept_file;

#[derive(Debug, Clone, Default)]
pub struct ConceptDictionary {
    entries: Arc<RwLock<HashMap<String, Vec<ConceptInfo>>>>,
}

impl ConceptDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a concept by the canonical value of a step invoking it.
    pub fn lookup(&self, value: &str) -> Option<ConceptInfo> {
        self.entries
            .read()
            .get(value)
            .and_then(|owners| owners.first())
            .cloned()
    }

    /// Index the concepts declared in `content`, replacing whatever was
    /// previously indexed for `file`.
    ///
    /// On a parse error the previous entries for `file` are left untouched,
    /// so a concept file being edited keeps resolving until it parses again.
    /// Returns the number of concepts indexed.
    pub fn add_file(&self, file: &Path, content: &str) -> Result<usize, ParseError> {
        let concepts = parser::parse_concepts(content, &file.to_string_lossy())?;

        let mut entries = self.entries.write();
        forget_file(&mut entries, file);
        for concept in &concepts {
            entries
                .entry(concept.heading.value.clone())
                .or_default()
                .push(ConceptInfo {
                    file: file.to_path_buf(),
                    line_no: concept.heading.line_no,
                });
        }
        Ok(concepts.len())
    }

    /// Forget every concept declared in `file`.
    pub fn remove_file(&self, file: &Path) {
        forget_file(&mut self.entries.write(), file);
    }

    /// Walk `root` (honouring `.gitignore`) and index every concept file.
    ///
    /// Files that cannot be read or parsed are skipped with a warning.
    /// Returns the list of concept files that were indexed.
    pub fn load_workspace(&self, root: &Path) -> Vec<PathBuf> {
        let mut loaded = Vec::new();
        for entry in WalkBuilder::new(root).build().flatten() {
            let path = entry.path();
            if !entry.file_type().is_some_and(|ft| ft.is_file()) || !is_concept_file(path) {
                continue;
            }
            let content = match std::fs::read_to_string(path) {
                Ok(c) => c,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "skipping unreadable concept file");
                    continue;
                }
            };
            match self.add_file(path, &content) {
                Ok(count) => {
                    tracing::debug!(path = %path.display(), count, "indexed concept file");
                    loaded.push(path.to_path_buf());
                }
                Err(err) => {
                    tracing::warn!(%err, "skipping concept file that does not parse");
                }
            }
        }
        loaded
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn forget_file(entries: &mut HashMap<String, Vec<ConceptInfo>>, file: &Path) {
    entries.retain(|_, owners| {
        owners.retain(|info| info.file != file);
        !owners.is_empty()
    });
}
