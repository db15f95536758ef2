//! GaugeLSP - a go-to-definition language server for Gauge specifications.
//!
//! - [`server`]: the `LanguageServer` implementation (document sync,
//!   workspace indexing, `textDocument/definition`).
//! - [`definition`]: goto-definition resolution for steps and concepts.
//! - [`concepts`]: the concept dictionary, built from `.cpt` files.
//! - [`runner`]: the request/response channel to the step runner.
//! - [`line_cache`]: lines of files that are not open in the editor.
//! - [`parser`]: step and concept extraction from spec/concept text.
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use parking_lot::RwLock;
use tower_lsp::Client;

pub mod concepts;
pub mod config;
mod definition;
pub mod error;
pub mod line_cache;
pub mod parser;
pub mod runner;
mod server;
pub mod types;
pub mod util;

pub use concepts::ConceptDictionary;
pub use config::Config;
pub use error::DefinitionError;
pub use line_cache::LineCache;
pub use runner::{RunnerConnection, SharedRunner};

pub struct Backend {
    name: String,
    version: String,
    /// Content of every document currently open in the editor, by URI.
    open_files: Arc<Mutex<HashMap<String, String>>>,
    workspace_root: Arc<Mutex<Option<PathBuf>>>,
    concepts: ConceptDictionary,
    /// Lines of concept files read from disk.
    disk_cache: LineCache,
    /// The connected runner session, if any.
    runner: Arc<RwLock<Option<SharedRunner>>>,
    config: Config,
    client: Option<Client>,
}

impl Backend {
    pub fn new(client: Client, config: Config) -> Self {
        Self {
            client: Some(client),
            ..Self::with_config(config)
        }
    }

    pub fn new_test() -> Self {
        Self::with_config(Config::default())
    }

    /// A test backend whose workspace root is already known, as if the
    /// client had sent it in `initialize`.
    pub fn new_test_with_workspace(root: PathBuf) -> Self {
        let backend = Self::new_test();
        if let Ok(mut wr) = backend.workspace_root.lock() {
            *wr = Some(root);
        }
        backend
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            name: "GaugeLSP".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            open_files: Arc::new(Mutex::new(HashMap::new())),
            workspace_root: Arc::new(Mutex::new(None)),
            concepts: ConceptDictionary::new(),
            disk_cache: LineCache::new(),
            runner: Arc::new(RwLock::new(None)),
            config,
            client: None,
        }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_version(&self) -> &str {
        &self.version
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn concepts(&self) -> &ConceptDictionary {
        &self.concepts
    }

    pub fn disk_cache(&self) -> &LineCache {
        &self.disk_cache
    }

    /// Install a runner session, or clear it with `None`.
    pub fn set_runner(&self, runner: Option<SharedRunner>) {
        *self.runner.write() = runner;
    }

    /// The current runner session, if one is connected.
    pub fn runner(&self) -> Option<SharedRunner> {
        self.runner.read().clone()
    }

    pub(crate) fn workspace_root(&self) -> Option<PathBuf> {
        self.workspace_root
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }
}
