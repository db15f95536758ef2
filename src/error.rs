//! Error types for goto-definition resolution.
//!
//! Only failures the user can act on live here.  "Nothing at this
//! position", a document that does not parse, and a runner that is not
//! connected are all represented as `Ok(None)` by the resolvers.

use std::path::PathBuf;

use tower_lsp::jsonrpc;

use crate::runner::RunnerError;

/// A goto-definition request failed in a way worth reporting to the client.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    /// The request payload is not a valid `TextDocumentPositionParams`.
    #[error("malformed definition request: {0}")]
    MalformedRequest(#[from] serde_json::Error),

    /// The runner could not be reached or did not answer in time.
    #[error(transparent)]
    Runner(#[from] RunnerError),

    /// The runner answered, and it has no implementation for the step.
    #[error("Step implementation not found for step : {step_value}")]
    StepNotImplemented {
        /// Canonical value of the unresolved step.
        step_value: String,
    },

    /// The file declaring a concept could not be read.
    #[error("failed to read {}: {source}", path.display())]
    ReadFile {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A path reported by the runner or the concept dictionary cannot be
    /// turned into a `file://` URI.
    #[error("cannot convert path to a file URI: {}", path.display())]
    InvalidPath {
        /// The offending path.
        path: PathBuf,
    },
}

impl From<DefinitionError> for jsonrpc::Error {
    fn from(err: DefinitionError) -> Self {
        match err {
            DefinitionError::MalformedRequest(_) => jsonrpc::Error::invalid_params(err.to_string()),
            other => jsonrpc::Error {
                code: jsonrpc::ErrorCode::InternalError,
                message: other.to_string().into(),
                data: None,
            },
        }
    }
}
