use std::sync::Arc;

use mailmock::api::{build_router, AppState};
use mailmock::config::{AppConfig, SeedConfig};
use mailmock::types::{AddressStatus, AddressType};
use mailmock::Backend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = AppConfig::from_env()?;
    tracing::info!("mailmock starting...");
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);
    tracing::info!("Domain: {}", config.backend.domain);

    let backend = Arc::new(Backend::new(config.backend.clone()));

    if let Some(seed) = &config.seed {
        seed_user(&backend, seed).await?;
    }

    let app = build_router(AppState { backend });

    // Start server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("mailmock API listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the configured user with a primary address on the backend domain
async fn seed_user(backend: &Backend, seed: &SeedConfig) -> anyhow::Result<()> {
    let account_id = backend
        .create_account(&seed.username, seed.password.as_bytes())
        .await?;

    let email = format!("{}@{}", seed.username, backend.domain().await);
    backend
        .create_address(
            &account_id,
            &email,
            true,
            AddressStatus::Enabled,
            AddressType::Original,
        )
        .await?;

    tracing::info!("Seeded user '{}' <{}>", seed.username, email);

    Ok(())
}
