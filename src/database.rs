//! # Postgres
//!
//! The sole backing store. One table (`ideas`), one pool shared by every
//! request handler and closed on shutdown after in-flight requests drain.
//!
//! The pool is built lazily so the process can come up while Postgres is
//! still starting; the migration runner owns the "wait until ready" loop
//! and the server's health endpoint reports probe failures.

use std::{str::FromStr, time::Duration};

use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
};

use crate::config::Config;

pub const MAX_CONNECTIONS: u32 = 20;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

pub fn init_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    let ssl_mode = if config.database_ssl {
        PgSslMode::Require
    } else {
        PgSslMode::Disable
    };

    let options = PgConnectOptions::from_str(&config.database_url)?.ssl_mode(ssl_mode);

    Ok(PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .idle_timeout(IDLE_TIMEOUT)
        .connect_lazy_with(options))
}

pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}
