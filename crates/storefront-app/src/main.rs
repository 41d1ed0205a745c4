use storefront_hex::config::Config;
use storefront_hex::inbound::http::{HttpServer, HttpServerConfig};
use storefront_repo::seed::demo_catalog;
use storefront_repo::{build_repo, Repo};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for DATABASE_URL / SERVER_PORT / ADMIN_TOKEN when present.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string()))
        .init();

    let config = Config::from_env()?;
    let repo: Repo = build_repo(config.database_url.as_deref()).await?;
    if config.seed_catalog {
        let seeded = repo.seed_if_empty(demo_catalog()).await?;
        tracing::info!(backend = repo.backend(), seeded, "catalog ready");
    }
    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN is not set; admin routes will refuse every request");
    }

    let server_cfg = HttpServerConfig {
        port: config.server_port.clone(),
        admin_token: config.admin_token.clone(),
        status_policy: config.status_policy,
    };

    let http = HttpServer::new(repo, server_cfg).await?;
    http.run().await
}
