use dotenvy::dotenv;
use log::info;
use std::sync::Arc;

use gtmserver::api_router::build_router;
use gtmserver::config::AppConfig;
use gtmserver::crm::HubspotClient;
use gtmserver::llm::TogetherClient;
use gtmserver::shared::state::AppState;
use gtmserver::shared::utils::{create_conn, run_migrations};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;

    let pool = create_conn(&config.database_url())?;
    run_migrations(&pool)?;

    let llm = Arc::new(TogetherClient::new(
        config.llm.api_key.clone(),
        Some(config.llm.base_url.clone()),
        config.llm.model.clone(),
    ));
    let crm = Arc::new(HubspotClient::new(
        config.crm.api_token.clone(),
        Some(config.crm.base_url.clone()),
    ));

    let state = Arc::new(AppState {
        conn: pool,
        llm,
        crm,
    });

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("gtmserver listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
