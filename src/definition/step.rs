/// Step implementation lookup through the runner.
///
/// The runner is asked for the step by its canonical value.  Unlike a
/// concept miss, a runner that answers "not present" is reported as an
/// error: the step has no implementation yet, which the user will want to
/// know about.
use std::path::Path;

use tower_lsp::lsp_types::*;

use crate::Backend;
use crate::error::DefinitionError;
use crate::runner::{RunnerMessage, SharedRunner, Span};
use crate::types::Step;
use crate::util::path_to_uri;

impl Backend {
    /// Ask `runner` where `step` is implemented.
    ///
    /// No runner connected is an ordinary state (e.g. during startup) and
    /// yields `Ok(None)`, as does a runner whose connection has closed.
    /// Timeouts and a connection dropping mid-request are returned as
    /// [`DefinitionError::Runner`]; there is no retry.
    pub(crate) async fn search_step(
        &self,
        step: &Step,
        runner: Option<&SharedRunner>,
    ) -> Result<Option<Location>, DefinitionError> {
        let Some(runner) = runner.filter(|runner| runner.is_connected()) else {
            tracing::debug!(step = %step.value, "no runner connected");
            return Ok(None);
        };

        let request = RunnerMessage::step_name_request(step.value.as_str());
        let reply = runner
            .request(request, self.config.runner_request_timeout)
            .await
            .inspect_err(|err| tracing::warn!(step = %step.value, %err, "runner request failed"))?;

        let response = match reply.step_name_response() {
            Some(response) if response.is_step_present => response,
            _ => {
                tracing::debug!(
                    step = %step.text,
                    line = step.line_no,
                    "runner has no implementation for step"
                );
                return Err(DefinitionError::StepNotImplemented {
                    step_value: step.value.clone(),
                });
            }
        };

        self.step_location(&response.file_name, response.span)
            .map(Some)
    }

    /// Translate the runner's 1-based span into a zero-based LSP location.
    /// Character offsets are passed through as reported.
    fn step_location(&self, file_name: &str, span: Span) -> Result<Location, DefinitionError> {
        let path = Path::new(file_name);
        let uri = path_to_uri(path, self.workspace_root().as_deref()).ok_or_else(|| {
            DefinitionError::InvalidPath {
                path: path.to_path_buf(),
            }
        })?;

        let start_line = span.start.saturating_sub(1);
        let end_line = span.end.saturating_sub(1).max(start_line);

        Ok(Location {
            uri,
            range: Range {
                start: Position {
                    line: start_line,
                    character: span.start_char,
                },
                end: Position {
                    line: end_line,
                    character: span.end_char,
                },
            },
        })
    }
}
