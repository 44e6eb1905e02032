use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use mentorhub::{
    auth::jwt::JwtService,
    calendar::{CalendarService, CalendlyClient},
    config::AppConfig,
    db, routes,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "api",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        calendly_enabled = config.calendly_api_token.is_some(),
        "loaded backend configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    let calendar: Arc<dyn CalendarService> = Arc::new(CalendlyClient::from_config(&config));
    let jwt = JwtService::from_config(&config)?;

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let state = AppState::new(pool, config, calendar, jwt);
    let router = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
