use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

use gauge_lsp::runner::StreamRunner;
use gauge_lsp::{Backend, Config, SharedRunner};

/// Go-to-definition language server for Gauge specifications.
///
/// Speaks LSP over stdin/stdout.  Logs go to stderr, filtered by the
/// `GAUGE_LSP_LOG` environment variable (e.g. `GAUGE_LSP_LOG=debug`).
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Address of a running step runner (e.g. `127.0.0.1:50051`).
    #[arg(long, env = "GAUGE_RUNNER_ADDRESS")]
    runner: Option<String>,

    /// How long to wait for the runner to answer, in milliseconds.
    #[arg(long, value_name = "MS")]
    runner_timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("GAUGE_LSP_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();

    let workspace = std::env::current_dir().ok();
    let mut config = match Config::load(workspace.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(%err, "ignoring invalid configuration");
            Config::default()
        }
    };
    if let Some(ms) = args.runner_timeout_ms {
        config.runner_request_timeout = Duration::from_millis(ms);
    }
    if args.runner.is_some() {
        config.runner_address = args.runner;
    }

    let runner: Option<SharedRunner> = match config.runner_address.as_deref() {
        Some(addr) => match StreamRunner::connect(addr).await {
            Ok(runner) => {
                tracing::info!(addr, "connected to runner");
                Some(Arc::new(runner))
            }
            Err(err) => {
                tracing::warn!(addr, %err, "runner unavailable, step implementations will not resolve");
                None
            }
        },
        None => None,
    };

    let (service, socket) = LspService::new(move |client| {
        let backend = Backend::new(client, config);
        backend.set_runner(runner);
        backend
    });
    Server::new(tokio::io::stdin(), tokio::io::stdout(), socket)
        .serve(service)
        .await;
}
