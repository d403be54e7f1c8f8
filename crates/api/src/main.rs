// Tavola account-security API
// HTTP surface for MFA enrollment, step-up, backup codes and session records

mod config;
mod handlers;
mod middleware;
mod routes;

use config::{Config, ProviderMode};
use dotenvy::dotenv;
use std::sync::Arc;
use tavola_auth::{
    BackupCodeManager, HostedProvider, IdentityProvider, JwtService, LocalProvider, SessionTracker,
};
use tavola_database::{BackupCodeRepository, SessionRecordRepository};

pub struct AppState {
    pub provider: Arc<dyn IdentityProvider>,
    pub backup_codes: BackupCodeManager,
    pub sessions: SessionTracker,
    pub jwt: JwtService,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,tavola_api=debug,tower_http=debug".to_string()),
        )
        .init();

    tracing::info!("🚀 Starting Tavola account-security API");
    tracing::info!("📦 Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::from_env();
    tracing::info!("🔌 Server: {}:{}", config.server_host, config.server_port);

    // Initialize database
    tracing::info!("🗄️  Connecting to database...");
    let database = tavola_database::Database::new(config.database.clone())
        .await
        .expect("Failed to connect to database");
    database.ping().await.expect("Database ping failed");
    tracing::info!("✅ Database connected");

    // Select identity provider
    let provider: Arc<dyn IdentityProvider> = match config.provider_mode {
        ProviderMode::Local => {
            tracing::info!("🔐 Using local in-process identity provider");
            Arc::new(LocalProvider::new("Tavola"))
        }
        ProviderMode::Hosted(hosted_config) => {
            tracing::info!("🔐 Using hosted identity provider at {}", hosted_config.base_url);
            Arc::new(HostedProvider::new(hosted_config))
        }
    };

    let pool = database.pool().clone();
    let backup_codes =
        BackupCodeManager::new(Arc::new(BackupCodeRepository::new(pool.clone())));
    let sessions = SessionTracker::new(SessionRecordRepository::new(pool));
    let jwt = JwtService::from_env();
    tracing::info!("🔑 Services initialized");

    let state = Arc::new(AppState {
        provider,
        backup_codes,
        sessions,
        jwt,
    });

    let app = routes::create_router(state);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌐 Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
