#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gauge_lsp::runner::{RunnerConnection, RunnerError, RunnerMessage, Span, StepNameResponse};
use gauge_lsp::{Backend, SharedRunner};
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

pub fn create_test_backend() -> Backend {
    Backend::new_test()
}

/// Helper: create a temp workspace with the given files, then return a
/// Backend with that workspace root whose concept dictionary has been
/// loaded from it.
pub fn create_workspace(files: &[(&str, &str)]) -> (Backend, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    for (rel_path, content) in files {
        let full = dir.path().join(rel_path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("failed to create dirs");
        }
        fs::write(&full, content).expect("failed to write file");
    }

    let backend = Backend::new_test_with_workspace(dir.path().to_path_buf());
    backend.concepts().load_workspace(dir.path());
    (backend, dir)
}

pub fn file_uri(path: &Path) -> Url {
    Url::from_file_path(path).expect("absolute path")
}

pub fn position(line: u32, character: u32) -> Position {
    Position { line, character }
}

pub fn definition_params(uri: &Url, line: u32, character: u32) -> GotoDefinitionParams {
    GotoDefinitionParams {
        text_document_position_params: TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
            position: position(line, character),
        },
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
    }
}

pub async fn open_document(backend: &Backend, uri: &Url, text: &str) {
    let open_params = DidOpenTextDocumentParams {
        text_document: TextDocumentItem {
            uri: uri.clone(),
            language_id: "gauge".to_string(),
            version: 1,
            text: text.to_string(),
        },
    };
    backend.did_open(open_params).await;
}

/// How the [`FakeRunner`] answers a given step value.
#[derive(Debug, Clone)]
pub enum FakeReply {
    Present { file_name: String, span: Span },
    Absent,
    Timeout,
    Disconnected,
}

/// A scripted runner.  Steps without a script are reported as absent.
#[derive(Default)]
pub struct FakeRunner {
    replies: HashMap<String, FakeReply>,
    requests: Mutex<Vec<String>>,
    disconnected: bool,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, step_value: &str, reply: FakeReply) -> Self {
        self.replies.insert(step_value.to_string(), reply);
        self
    }

    pub fn implemented(self, step_value: &str, file_name: &str, span: Span) -> Self {
        self.with_step(
            step_value,
            FakeReply::Present {
                file_name: file_name.to_string(),
                span,
            },
        )
    }

    /// Report the connection as closed.
    pub fn disconnected(mut self) -> Self {
        self.disconnected = true;
        self
    }

    /// Step values the runner has been asked about, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn install(self, backend: &Backend) -> Arc<FakeRunner> {
        let runner = Arc::new(self);
        let shared: SharedRunner = runner.clone();
        backend.set_runner(Some(shared));
        runner
    }
}

#[tower_lsp::async_trait]
impl RunnerConnection for FakeRunner {
    async fn request(
        &self,
        message: RunnerMessage,
        timeout: Duration,
    ) -> Result<RunnerMessage, RunnerError> {
        let (message_id, step_value) = match message {
            RunnerMessage::StepNameRequest {
                message_id,
                step_value,
            } => (message_id, step_value),
            other => panic!("unexpected message sent to runner: {other:?}"),
        };
        self.requests.lock().unwrap().push(step_value.clone());

        let response = match self.replies.get(&step_value).cloned() {
            Some(FakeReply::Present { file_name, span }) => StepNameResponse {
                is_step_present: true,
                file_name,
                span,
            },
            Some(FakeReply::Timeout) => return Err(RunnerError::Timeout(timeout)),
            Some(FakeReply::Disconnected) => return Err(RunnerError::Disconnected),
            Some(FakeReply::Absent) | None => StepNameResponse::default(),
        };
        Ok(RunnerMessage::StepNameResponse {
            message_id,
            response,
        })
    }

    fn is_connected(&self) -> bool {
        !self.disconnected
    }
}

pub fn span(start: u32, start_char: u32, end: u32, end_char: u32) -> Span {
    Span {
        start,
        start_char,
        end,
        end_char,
    }
}

pub fn workspace_path(dir: &tempfile::TempDir, rel: &str) -> PathBuf {
    dir.path().join(rel)
}
