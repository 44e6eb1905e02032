use std::time::Duration;

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub const DEFAULT_MAX_POOL_SIZE: u32 = 2;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the r2d2 pool the API and notifier binaries share. Booking and
/// council transactions hold row locks, so the default stays small.
pub fn init_pool_with_size(database_url: &str, max_size: u32) -> anyhow::Result<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Ok(Pool::builder()
        .max_size(max_size.max(1))
        .connection_timeout(CONNECT_TIMEOUT)
        .build(manager)?)
}
