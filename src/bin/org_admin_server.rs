//! Organization admin REST API server
//!
//! Exposes duplicate detection and the merge preview/execute flow over
//! HTTP.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/org_admin \
//! DIRECTORY_API_URL=https://directory.example.com \
//! DIRECTORY_API_KEY=sk_live_... \
//! cargo run --bin org_admin_server --features server
//!
//! curl "http://localhost:3000/api/organizations/duplicates?by=name"
//!
//! curl -X POST http://localhost:3000/api/organizations/merge/preview \
//!   -H "Content-Type: application/json" \
//!   -d '{"primary_org_id": "org_01", "secondary_org_id": "org_02"}'
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use org_admin::api::create_merge_router;
use org_admin::database::{DatabaseConfig, DatabaseManager};
use org_admin::directory::DirectoryClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let manager = DatabaseManager::new(DatabaseConfig::default())
        .await
        .context("failed to connect to the organization store")?;
    manager
        .verify_schema()
        .await
        .context("organization store schema verification failed")?;

    let directory = Arc::new(
        DirectoryClient::from_env().context("directory client configuration failed")?,
    );

    let app = create_merge_router(manager.pool().clone(), directory).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
    );

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!(%addr, "org-admin server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind server address")?;
    axum::serve(listener, app)
        .await
        .context("server terminated")?;

    Ok(())
}
