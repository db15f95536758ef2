/// Goto-definition resolution.
///
/// Given a cursor position in a Gauge document this module:
///   1. Classifies the document (concept file or spec file).
///   2. Parses it into steps with the matching parser.
///   3. Picks the step declared on the cursor's line.
///   4. Searches the concept dictionary, then the runner.
///   5. Returns an LSP `Location` the editor can jump to.
///
/// A document that does not parse is treated as having no steps: while the
/// user is typing the text is often invalid, and that must not turn into an
/// error popup.
use tower_lsp::lsp_types::*;

use crate::Backend;
use crate::error::DefinitionError;
use crate::parser;
use crate::runner::SharedRunner;
use crate::types::{DocumentKind, Step};
use crate::util::document_kind;

impl Backend {
    /// Handle a raw `textDocument/definition` payload.
    ///
    /// Fails with [`DefinitionError::MalformedRequest`] when `params` is not
    /// a `TextDocumentPositionParams` object.
    pub async fn definition_request(
        &self,
        params: serde_json::Value,
    ) -> Result<Option<Location>, DefinitionError> {
        let params: TextDocumentPositionParams = serde_json::from_value(params)?;
        self.resolve_definition(&params.text_document.uri, params.position)
            .await
    }

    /// Resolve the definition of the step at `position` in `uri`.
    ///
    /// Returns `Ok(None)` when there is no step on that line, when the
    /// document does not parse, or when the step is neither a concept nor
    /// resolvable because no runner is connected.
    pub async fn resolve_definition(
        &self,
        uri: &Url,
        position: Position,
    ) -> Result<Option<Location>, DefinitionError> {
        let Some(step) = self.find_step_at(uri, position) else {
            tracing::debug!(%uri, line = position.line, "no step at position");
            return Ok(None);
        };

        // Snapshot the session once so the whole request sees one runner.
        let runner = self.runner();
        self.search(&step, runner.as_ref()).await
    }

    /// Concepts first: a step invoking a concept should land on the
    /// concept, not on whatever implements its inner steps.
    async fn search(
        &self,
        step: &Step,
        runner: Option<&SharedRunner>,
    ) -> Result<Option<Location>, DefinitionError> {
        if let Some(location) = self.search_concept(step)? {
            tracing::debug!(step = %step.value, uri = %location.uri, "resolved to concept");
            return Ok(Some(location));
        }
        self.search_step(step, runner).await
    }

    /// The step whose declared line is the zero-based `position.line`.
    pub(crate) fn find_step_at(&self, uri: &Url, position: Position) -> Option<Step> {
        let content = self.get_content(uri.as_str());
        let context_path = uri
            .to_file_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| uri.to_string());

        let parsed = match document_kind(uri) {
            DocumentKind::Concept => parser::parse_concepts(&content, &context_path)
                .map(|concepts| concepts.into_iter().flat_map(|c| c.steps).collect()),
            DocumentKind::Spec => parser::parse_spec(&content, &context_path),
        };

        let steps = parsed.unwrap_or_else(|err| {
            tracing::debug!(%err, "document does not parse, ignoring");
            Vec::new()
        });

        steps
            .into_iter()
            .find(|step| step.line_no.checked_sub(1) == Some(position.line))
    }
}
