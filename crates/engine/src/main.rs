//! Archipelago Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use archipelago_engine::app::Repositories;
use archipelago_engine::infrastructure::{
    clock::SystemClock,
    config::{CorsOrigins, EngineConfig, StoreBackend},
    memory::InMemoryStore,
    ports::ClockPort,
    sqlite::SqliteStore,
};
use archipelago_engine::use_cases::{quests::policy_for, LoadCatalog, SyncCatalog};
use archipelago_engine::{api, App};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root.
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "archipelago_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Archipelago Engine");

    let config = EngineConfig::from_env();
    tracing::info!(
        backend = ?config.store_backend,
        clearance_policy = ?config.clearance_policy,
        "Configuration loaded"
    );

    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());

    let repositories = match config.store_backend {
        StoreBackend::Sqlite => {
            tracing::info!(path = %config.database_path, "Opening SQLite store");
            Repositories::from_store(Arc::new(SqliteStore::new(&config.database_path).await?))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; progression is lost on restart");
            Repositories::from_store(Arc::new(InMemoryStore::new()))
        }
    };

    // Catalog integrity failures abort startup
    if let Some(path) = &config.catalog_path {
        let outcome = SyncCatalog::new(
            repositories.catalog.clone(),
            repositories.quests.clone(),
            clock.clone(),
        )
        .from_file(path, config.catalog_sync_mode)
        .await
        .inspect_err(|e| tracing::error!(path = %path.display(), error = %e, "Catalog sync failed"))?;
        tracing::info!(path = %path.display(), outcome = ?outcome, "Catalog file processed");
    }
    let catalog = LoadCatalog::new(repositories.catalog.clone())
        .execute()
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Catalog could not be loaded"))?;

    let app = Arc::new(App::new(
        catalog,
        repositories,
        policy_for(config.clearance_policy),
        clock,
    ));

    if config.reconcile_on_startup {
        let report = app.use_cases.reconciliation.all.execute().await?;
        tracing::info!(
            repaired = report.repaired,
            already_consistent = report.already_consistent,
            failed = report.failed,
            "Startup reconciliation finished"
        );
    }

    // Spawn periodic reconciliation sweep
    if let Some(period) = config.reconcile_interval {
        let sweep_app = app.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick fires immediately; startup already reconciled.
            interval.tick().await;
            loop {
                interval.tick().await;
                match sweep_app.use_cases.reconciliation.all.execute().await {
                    Ok(report) => tracing::info!(
                        repaired = report.repaired,
                        failed = report.failed,
                        "Reconciliation sweep finished"
                    ),
                    Err(e) => tracing::warn!(error = %e, "Reconciliation sweep failed"),
                }

                let pruned = sweep_app.locks.prune_idle();
                if pruned > 0 {
                    tracing::debug!(pruned, "Pruned idle user locks");
                }
            }
        });
    }

    let mut router = api::http::routes()
        .with_state(app)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = build_cors_layer(&config.cors_origins) {
        router = router.layer(cors);
    }

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

fn build_cors_layer(origins: &CorsOrigins) -> Option<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    match origins {
        CorsOrigins::Disabled => None,
        CorsOrigins::Any => Some(cors.allow_origin(Any)),
        CorsOrigins::List(list) => {
            let origins: Vec<HeaderValue> = list
                .iter()
                .filter_map(|s| {
                    HeaderValue::from_str(s)
                        .inspect_err(|_| tracing::warn!(origin = %s, "Ignoring invalid CORS origin"))
                        .ok()
                })
                .collect();
            if origins.is_empty() {
                return None;
            }
            Some(cors.allow_origin(origins))
        }
    }
}
