//! Generation API server - HTTP front end for the forge engine.

mod planner;
mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use clap::Parser;
use forge::config::{self, EngineConfig};
use forge::engine::ExecutionEngine;
use forge::io::packager::DirPackager;
use forge::metrics::Metrics;
use forge::planner::PlanSource;
use forge::service::GenerationService;
use forge::store::StorePaths;
use forge::store::logs::LogSink;
use forge::tools::ToolRegistry;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::planner::OllamaPlanner;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "forge-server")]
#[command(about = "HTTP API for plan-driven application generation")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "8000")]
    port: u16,

    /// Data root directory (contains projects/, output/, archives/)
    #[arg(long, default_value = ".forge")]
    data_root: PathBuf,

    /// Base URL of the Ollama planner backend
    #[arg(long, default_value = "http://127.0.0.1:11434")]
    ollama_url: String,

    /// Model name passed to the planner backend
    #[arg(long, default_value = "llama3")]
    model: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("forge_server=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let paths = StorePaths::new(args.data_root.clone());
    let engine_config: EngineConfig = config::load_config(&paths.config_path())?;
    info!(data_root = %args.data_root.display(), "starting forge-server");

    let logs = Arc::new(LogSink::new(paths.clone()));
    let registry = ToolRegistry::builtin();
    let metrics = Arc::new(Metrics::default());
    let engine = Arc::new(ExecutionEngine::new(
        paths.clone(),
        Arc::clone(&logs),
        registry.clone(),
        Arc::new(DirPackager::new(paths.archives_dir())),
        Arc::clone(&metrics),
        engine_config.clone(),
    ));
    let plan_source = PlanSource::new(
        Arc::new(OllamaPlanner::new(args.ollama_url, args.model)),
        registry.names().iter().map(|s| s.to_string()).collect(),
    );
    let service = Arc::new(GenerationService::new(
        paths,
        logs,
        plan_source,
        engine,
        engine_config,
    ));
    let state = AppState::new(service, metrics);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api/v1", routes::api_router())
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
