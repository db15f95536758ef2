/// LSP server trait implementation.
///
/// This module contains the `impl LanguageServer for Backend` block,
/// which handles the LSP protocol messages (initialize, didOpen, didChange,
/// didSave, didClose, definition).
use tower_lsp::LanguageServer;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;

use crate::Backend;
use crate::util::{is_concept_file, uri_to_path};

impl Backend {
    /// Re-index the concepts of `uri` from `text` if it is a concept file.
    ///
    /// Text that does not parse keeps the previously indexed concepts.
    fn index_concept_document(&self, uri: &str, text: &str) {
        let Some(path) = uri_to_path(uri) else {
            return;
        };
        if !is_concept_file(&path) {
            return;
        }
        match self.concepts.add_file(&path, text) {
            Ok(count) => tracing::debug!(%uri, count, "re-indexed concept file"),
            Err(err) => tracing::debug!(%err, "concept file does not parse, keeping old entries"),
        }
    }

    /// After an editor buffer goes away, the file on disk is the truth again.
    fn reindex_concept_from_disk(&self, uri: &str) {
        let Some(path) = uri_to_path(uri) else {
            return;
        };
        if !is_concept_file(&path) {
            return;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => self.index_concept_document(uri, &text),
            Err(_) => self.concepts.remove_file(&path),
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        // Extract and store the workspace root path
        let workspace_root = params
            .root_uri
            .as_ref()
            .or_else(|| {
                params
                    .workspace_folders
                    .as_ref()
                    .and_then(|folders| folders.first())
                    .map(|folder| &folder.uri)
            })
            .and_then(|uri| uri.to_file_path().ok());

        if let Some(root) = workspace_root
            && let Ok(mut wr) = self.workspace_root.lock()
        {
            *wr = Some(root);
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(true),
                        })),
                        ..TextDocumentSyncOptions::default()
                    },
                )),
                definition_provider: Some(OneOf::Left(true)),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: self.name.clone(),
                version: Some(self.version.clone()),
            }),
            offset_encoding: None,
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let Some(root) = self.workspace_root() else {
            self.log(MessageType::INFO, "GaugeLSP initialized!".to_string())
                .await;
            return;
        };

        let concepts = self.concepts.clone();
        let scan_root = root.clone();
        let loaded = tokio::task::spawn_blocking(move || concepts.load_workspace(&scan_root))
            .await
            .unwrap_or_default();

        let runner_status = if self.runner().is_some() {
            "connected"
        } else {
            "not connected"
        };

        self.log(
            MessageType::INFO,
            format!(
                "GaugeLSP initialized! Loaded {} concept(s) from {} file(s) in {}, runner {}",
                self.concepts.len(),
                loaded.len(),
                root.display(),
                runner_status
            ),
        )
        .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        let uri = doc.uri.to_string();
        let text = doc.text;

        // Store file content
        if let Ok(mut files) = self.open_files.lock() {
            files.insert(uri.clone(), text.clone());
        }

        self.index_concept_document(&uri, &text);

        self.log(MessageType::INFO, format!("Opened file: {}", uri))
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.to_string();

        if let Some(change) = params.content_changes.into_iter().last() {
            let text = change.text;

            self.index_concept_document(&uri, &text);

            if let Ok(mut files) = self.open_files.lock() {
                files.insert(uri, text);
            }
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        match params.text {
            Some(text) => self.index_concept_document(&uri, &text),
            None => self.reindex_concept_from_disk(&uri),
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri.to_string();

        if let Ok(mut files) = self.open_files.lock() {
            files.remove(&uri);
        }

        self.reindex_concept_from_disk(&uri);

        self.log(MessageType::INFO, format!("Closed file: {}", uri))
            .await;
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        match self.resolve_definition(&uri, position).await {
            Ok(location) => Ok(location.map(GotoDefinitionResponse::Scalar)),
            Err(err) => {
                tracing::debug!(%uri, %err, "definition request failed");
                Err(err.into())
            }
        }
    }
}
