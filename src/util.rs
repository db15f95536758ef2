/// Utility functions for the GaugeLSP server.
///
/// This module contains file classification, path/URI conversion,
/// document content lookup (open buffer first, disk second), and logging.
use std::path::{Path, PathBuf};

use tower_lsp::lsp_types::*;

use crate::Backend;
use crate::types::DocumentKind;

/// File extension of Gauge concept files.
pub const CONCEPT_EXTENSION: &str = "cpt";

/// Whether `path` names a concept file.
pub fn is_concept_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(CONCEPT_EXTENSION))
}

/// Classify the document behind `uri`.
///
/// URIs that are not `file://` URIs are classified by the extension of
/// their path component.
pub fn document_kind(uri: &Url) -> DocumentKind {
    let path = uri
        .to_file_path()
        .unwrap_or_else(|_| PathBuf::from(uri.path()));
    if is_concept_file(&path) {
        DocumentKind::Concept
    } else {
        DocumentKind::Spec
    }
}

/// Convert a file system path to a `file://` URI.
///
/// Relative paths are resolved against `base` (normally the workspace
/// root).  Returns `None` when no absolute path can be formed.
pub fn path_to_uri(path: &Path, base: Option<&Path>) -> Option<Url> {
    if path.is_absolute() {
        return Url::from_file_path(path).ok();
    }
    let joined = base?.join(path);
    Url::from_file_path(joined).ok()
}

/// Convert a `file://` URI back to a file system path.
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    Url::parse(uri).ok()?.to_file_path().ok()
}

/// Length of `line` in LSP character units (UTF-16 code units).
pub fn line_length(line: &str) -> u32 {
    u32::try_from(line.encode_utf16().count()).unwrap_or(u32::MAX)
}

impl Backend {
    /// Whether `uri` is currently open in the editor.
    pub fn is_open(&self, uri: &str) -> bool {
        self.open_files
            .lock()
            .map(|files| files.contains_key(uri))
            .unwrap_or(false)
    }

    /// Text of zero-based line `index` of an open document, or an empty
    /// string when the document is not open or the line does not exist.
    pub fn get_line(&self, uri: &str, index: usize) -> String {
        self.open_files
            .lock()
            .ok()
            .and_then(|files| {
                files
                    .get(uri)
                    .and_then(|text| text.lines().nth(index).map(str::to_string))
            })
            .unwrap_or_default()
    }

    /// Content of `uri`: the open buffer if the editor has it open,
    /// otherwise the file on disk.  Unreadable documents are empty.
    pub(crate) fn get_content(&self, uri: &str) -> String {
        if let Ok(files) = self.open_files.lock()
            && let Some(text) = files.get(uri)
        {
            return text.clone();
        }

        uri_to_path(uri)
            .and_then(|path| std::fs::read_to_string(path).ok())
            .unwrap_or_default()
    }

    pub(crate) async fn log(&self, typ: MessageType, message: String) {
        if let Some(client) = &self.client {
            client.log_message(typ, message).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concept_files_are_recognised_by_extension() {
        assert!(is_concept_file(Path::new("/p/specs/login.cpt")));
        assert!(is_concept_file(Path::new("LOGIN.CPT")));
        assert!(!is_concept_file(Path::new("/p/specs/login.spec")));
        assert!(!is_concept_file(Path::new("/p/specs/cpt")));
    }

    #[test]
    fn document_kind_follows_the_uri_path() {
        let concept = Url::parse("file:///p/specs/login.cpt").unwrap();
        let spec = Url::parse("file:///p/specs/login.spec").unwrap();
        let untitled = Url::parse("untitled:login.cpt").unwrap();
        assert_eq!(document_kind(&concept), DocumentKind::Concept);
        assert_eq!(document_kind(&spec), DocumentKind::Spec);
        assert_eq!(document_kind(&untitled), DocumentKind::Concept);
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let uri = path_to_uri(Path::new("src/Steps.java"), Some(Path::new("/project"))).unwrap();
        assert_eq!(uri.as_str(), "file:///project/src/Steps.java");
        assert!(path_to_uri(Path::new("src/Steps.java"), None).is_none());
    }

    #[test]
    fn uri_round_trips_to_path() {
        let path = uri_to_path("file:///project/specs/a.spec").unwrap();
        assert_eq!(path, PathBuf::from("/project/specs/a.spec"));
        assert!(uri_to_path("not a uri").is_none());
    }

    #[test]
    fn line_length_counts_utf16_units() {
        assert_eq!(line_length("Given a cat"), 11);
        assert_eq!(line_length("naïve"), 5);
        assert_eq!(line_length("🐈"), 2);
    }
}
