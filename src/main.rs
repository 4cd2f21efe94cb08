use env_logger::{Builder, Env};
use log::LevelFilter;
use payments_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Info by default, RUST_LOG overrides; sqlx statement logs stay quiet
    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("sqlx", LevelFilter::Warn)
        .init();

    let config = AppConfig::load()?;
    log::info!(
        "Configuration loaded: server={}, driver={}, api={}",
        config.server_address(),
        config.database.driver,
        config.api.version
    );

    payments_api::run_server(config).await
}
