use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pinforge_core::{
    load_config, validate_config, BatchLimits, CollectionRepository, FolderAssembler,
    GatewayFetchBatcher, HttpDagEndpoint, HttpGatewayTransport, HttpPinEndpoint,
    HttpScriptSource, JobScheduler, JobStore, LogNotifier, Notifier, PinBatchQueue,
    PipelineOrchestrator, ProcessRenderer, SqliteCollectionRepository, SqliteJobStore,
};

use pinforge_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging (PINFORGE_LOG_FORMAT=json for structured output)
    let json_logs = std::env::var("PINFORGE_LOG_FORMAT").is_ok_and(|format| format == "json");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    info!("pinforge {}", VERSION);

    // Determine config path
    let config_path = std::env::var("PINFORGE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Pinning API: {}", config.pinning.api_url);

    // Create SQLite job store
    let jobs: Arc<dyn JobStore> = Arc::new(
        SqliteJobStore::new(&config.database.path).context("Failed to create job store")?,
    );
    info!("Job store initialized");

    // Create SQLite collection repository
    let collections: Arc<dyn CollectionRepository> = Arc::new(
        SqliteCollectionRepository::new(&config.database.path)
            .context("Failed to create collection repository")?,
    );
    info!("Collection repository initialized");

    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier::default());

    // Pinning and folder assembly share the IPFS API credentials
    let pin_endpoint = Arc::new(
        HttpPinEndpoint::new(config.pinning.clone()).context("Failed to create pin endpoint")?,
    );
    let pins = PinBatchQueue::new(pin_endpoint, BatchLimits::from(&config.pinning));

    let dag_endpoint = Arc::new(
        HttpDagEndpoint::new(config.pinning.clone()).context("Failed to create DAG endpoint")?,
    );
    let folders = FolderAssembler::new(dag_endpoint, config.pinning.max_attempts);

    // Gateway batcher serves ipfs:// script locations
    let gateway_transport = Arc::new(
        HttpGatewayTransport::new(&config.gateway).context("Failed to create gateway client")?,
    );
    let gateway = GatewayFetchBatcher::new(gateway_transport, &config.gateway);
    info!(
        "Gateway batcher initialized ({} addresses per request, {} concurrent)",
        config.gateway.max_addresses_per_request, config.gateway.max_concurrent_requests
    );

    let scripts = Arc::new(
        HttpScriptSource::new(&config.renderer)
            .context("Failed to create script source")?
            .with_gateway(gateway),
    );
    let renderer = Arc::new(ProcessRenderer::new(config.renderer.clone()));
    info!(
        "Renderer: {:?} (up to {} frames in parallel)",
        config.renderer.command, config.renderer.max_parallel_frames
    );

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        Arc::clone(&jobs),
        Arc::clone(&collections),
        Arc::clone(&notifier),
        scripts,
        renderer,
        pins,
        folders,
        config.scheduler.clone(),
    ));

    let scheduler = Arc::new(JobScheduler::new(
        config.scheduler.clone(),
        Arc::clone(&jobs),
        collections,
        notifier,
        orchestrator,
    ));

    // Start the scheduler (requeues jobs left pending by a previous run)
    scheduler.start().context("Failed to start scheduler")?;

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        jobs,
        Arc::clone(&scheduler),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Stopping scheduler...");
    scheduler.stop();
    info!("Server shutting down...");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
