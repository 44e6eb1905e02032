use std::sync::Arc;

use crate::{
    auth::jwt::JwtService,
    calendar::CalendarService,
    config::AppConfig,
    db::{PgPool, PgPooledConnection},
    error::{AppError, AppResult},
};

/// Handles every request sees: the connection pool, parsed configuration,
/// the external calendar collaborator, and the token service.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub calendar: Arc<dyn CalendarService>,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: AppConfig,
        calendar: Arc<dyn CalendarService>,
        jwt: JwtService,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            calendar,
            jwt,
        }
    }

    pub fn db(&self) -> AppResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| AppError::internal(format!("database pool error: {err}")))
    }
}
