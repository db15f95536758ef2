/// Concept resolution.
///
/// A step whose value matches a concept heading resolves to that heading.
/// The range covers the whole heading line, so the line's text is needed:
/// it comes from the editor when the `.cpt` file is open, otherwise from
/// disk through the line cache.
use std::path::Path;

use tower_lsp::lsp_types::*;

use crate::Backend;
use crate::error::DefinitionError;
use crate::types::Step;
use crate::util::{line_length, path_to_uri};

impl Backend {
    /// Look `step` up in the concept dictionary.
    ///
    /// A miss is the normal case for ordinary steps and yields `Ok(None)`.
    pub(crate) fn search_concept(&self, step: &Step) -> Result<Option<Location>, DefinitionError> {
        let Some(concept) = self.concepts.lookup(&step.value) else {
            return Ok(None);
        };
        self.concept_location(&concept.file, concept.line_no)
            .map(Some)
    }

    /// Whole-line location of the 1-based `line_no` in `file`.
    fn concept_location(&self, file: &Path, line_no: u32) -> Result<Location, DefinitionError> {
        let uri = path_to_uri(file, self.workspace_root().as_deref()).ok_or_else(|| {
            DefinitionError::InvalidPath {
                path: file.to_path_buf(),
            }
        })?;
        let key = uri.as_str();
        let line = line_no.saturating_sub(1);
        let index = line as usize;

        let text = if self.is_open(key) {
            self.get_line(key, index)
        } else {
            let path = uri.to_file_path().unwrap_or_else(|_| file.to_path_buf());
            let contents =
                std::fs::read_to_string(&path).map_err(|source| DefinitionError::ReadFile {
                    path: path.clone(),
                    source,
                })?;
            self.disk_cache.add(key, &contents);
            self.disk_cache.line(key, index)
        };

        Ok(Location {
            range: Range {
                start: Position { line, character: 0 },
                end: Position {
                    line,
                    character: line_length(&text),
                },
            },
            uri,
        })
    }
}
