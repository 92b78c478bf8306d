//! topic-sync-api server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use topic_sync::auth::ForumCredentials;
use topic_sync::client::ForumClient;
use topic_sync::roster::HttpRosterSource;
use topic_sync::store::{StaticReferenceLookup, StaticTopicLinks};
use topic_sync::traits::{ReferenceLookup, TopicLinkStore};
use topic_sync::SyncOrchestrator;
use topic_sync_api::auth::TokenVerifier;
use topic_sync_api::config::{Config, LinkSource};
use topic_sync_api::{logging, router, AppState};

#[tokio::main]
async fn main() {
    // Load configuration (fail-fast on missing required values)
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init_logging(&config.rust_log) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        port = config.port,
        forum = %config.forum_base_url,
        "Starting topic-sync API"
    );

    let (links, lookup) = match build_stores(&config.link_source).await {
        Ok(stores) => stores,
        Err(e) => {
            tracing::error!("Failed to initialize stores: {e}");
            std::process::exit(1);
        }
    };

    let forum = match ForumClient::new(
        config.forum_base_url.clone(),
        ForumCredentials::new(config.forum_api_key.clone(), config.forum_api_username.clone()),
        config.request_timeout,
    ) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to create forum client: {e}");
            std::process::exit(1);
        }
    };

    let roster = match HttpRosterSource::new(lookup, config.request_timeout) {
        Ok(source) => source,
        Err(e) => {
            tracing::error!("Failed to create roster client: {e}");
            std::process::exit(1);
        }
    };

    let orchestrator = SyncOrchestrator::new(Arc::new(roster), links, Arc::new(forum))
        .with_mutation_concurrency(config.mutation_concurrency);
    let verifier = TokenVerifier::new(
        config.auth_secret.as_bytes(),
        config.auth_issuer.as_deref(),
    );
    let app = router(AppState::new(orchestrator, verifier));

    let addr: SocketAddr = match config.bind_addr().parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("Invalid bind address '{}': {e}", config.bind_addr());
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    info!(%addr, "Server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}

type Stores = (Arc<dyn TopicLinkStore>, Arc<dyn ReferenceLookup>);

async fn build_stores(source: &LinkSource) -> Result<Stores, String> {
    match source {
        LinkSource::Static { links, endpoints } => {
            info!(
                links = links.len(),
                references = endpoints.len(),
                "Using static topic links"
            );
            let links: StaticTopicLinks = links.iter().cloned().collect();
            let links: Arc<dyn TopicLinkStore> = Arc::new(links);
            let lookup: Arc<dyn ReferenceLookup> =
                Arc::new(StaticReferenceLookup::new(endpoints.clone()));
            Ok((links, lookup))
        }
        #[cfg(feature = "postgres")]
        LinkSource::Database { url } => {
            use topic_sync::store::{PgReferenceLookup, PgTopicLinks};

            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .map_err(|e| format!("database connection failed: {e}"))?;
            info!("Using database topic links");
            let links: Arc<dyn TopicLinkStore> = Arc::new(PgTopicLinks::new(pool.clone()));
            let lookup: Arc<dyn ReferenceLookup> = Arc::new(PgReferenceLookup::new(pool));
            Ok((links, lookup))
        }
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
