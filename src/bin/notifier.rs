use std::{sync::Arc, time::Duration};

use tokio::signal;
use tracing_subscriber::EnvFilter;

use mentorhub::{
    auth::jwt::JwtService,
    calendar::{CalendarService, CalendlyClient},
    config::AppConfig,
    db,
    notifications::{LogNotifier, Notifier, WebhookNotifier},
    state::AppState,
    NotificationWorker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "notifier",
        database_url = %config.redacted_database_url(),
        pool_size = 1,
        webhook_enabled = config.notifier_webhook_url.is_some(),
        "loaded backend configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    let calendar: Arc<dyn CalendarService> = Arc::new(CalendlyClient::from_config(&config));
    let jwt = JwtService::from_config(&config)?;

    let notifier: Arc<dyn Notifier> = match config.notifier_webhook_url.clone() {
        Some(endpoint) => Arc::new(WebhookNotifier::new(endpoint)),
        None => Arc::new(LogNotifier),
    };
    let poll_interval = Duration::from_secs(config.notifier_poll_seconds);

    let state = Arc::new(AppState::new(pool, config, calendar, jwt));
    let worker = NotificationWorker::new(state, notifier, poll_interval);

    tokio::select! {
        _ = worker.run() => {}
        _ = signal::ctrl_c() => {
            tracing::info!("notifier received shutdown signal");
        }
    }

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
