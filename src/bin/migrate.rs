//! Deployment-time migration runner. Exits 0 when every script applied,
//! 1 when the database never became ready or a script exhausted its
//! retries. Serving traffic against an unmigrated schema is unsafe, so
//! there is no partial-success mode.

use std::{path::Path, process::ExitCode};

use ideaboard::{config::Config, database::init_pool, migrate};
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load();

    let pool = match init_pool(&config) {
        Ok(pool) => pool,
        Err(err) => {
            error!("invalid database configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    let result = migrate::run(&pool, Path::new(migrate::DEFAULT_MIGRATIONS_DIR)).await;
    pool.close().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("migration failed: {err}");
            ExitCode::FAILURE
        }
    }
}
