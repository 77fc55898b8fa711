//! Startup schema migration.
//!
//! Runs once at deployment time, before the API sees traffic. Scripts
//! live in `migrations/` and apply in filename order; that ordering plus
//! script idempotence ("create if not exists") is the entire versioning
//! mechanism, there is no ledger of applied scripts. Each file executes
//! as a single unit so multi-statement blocks are not split up.

use std::{
    fs,
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use sqlx::PgPool;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";
pub const READY_ATTEMPTS: u32 = 30;
pub const APPLY_ATTEMPTS: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_millis(1000);

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("database not ready after {0} attempts")]
    NotReady(u32),

    #[error("failed to read migration scripts: {0}")]
    Io(#[from] io::Error),

    #[error("script {name} failed after {attempts} attempts: {source}")]
    ScriptFailed {
        name: String,
        attempts: u32,
        source: sqlx::Error,
    },
}

/// Probe until Postgres accepts a query. Handles the startup race where
/// the database container is still coming up when we run.
pub async fn wait_for_database(
    pool: &PgPool,
    max_attempts: u32,
    delay: Duration,
) -> Result<(), MigrateError> {
    for attempt in 1..=max_attempts {
        match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => {
                info!("database ready (attempt {attempt})");
                return Ok(());
            }
            Err(err) => {
                warn!("database not ready yet (attempt {attempt}/{max_attempts}): {err}");
                sleep(delay).await;
            }
        }
    }

    Err(MigrateError::NotReady(max_attempts))
}

/// All `.sql` files in `dir`, sorted by filename. Filename order is the
/// only versioning mechanism, so prefixes must be zero-padded.
pub fn discover_scripts(dir: &Path) -> Result<Vec<PathBuf>, MigrateError> {
    let mut scripts: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "sql"))
        .collect();

    scripts.sort();

    Ok(scripts)
}

/// One script, as a single unit of execution, with bounded retries.
pub async fn apply_script(pool: &PgPool, name: &str, sql: &str) -> Result<(), MigrateError> {
    let mut attempt = 1;

    loop {
        match sqlx::raw_sql(sql).execute(pool).await {
            Ok(_) => return Ok(()),
            Err(err) if attempt < APPLY_ATTEMPTS => {
                warn!("retry {attempt}/{APPLY_ATTEMPTS} for {name}: {err}");
                attempt += 1;
                sleep(RETRY_DELAY).await;
            }
            Err(err) => {
                return Err(MigrateError::ScriptFailed {
                    name: name.to_string(),
                    attempts: APPLY_ATTEMPTS,
                    source: err,
                });
            }
        }
    }
}

/// Full run: wait for the database, then apply every script in order.
/// Aborts on the first script that exhausts its retries; scripts already
/// applied are not rolled back.
pub async fn run(pool: &PgPool, dir: &Path) -> Result<(), MigrateError> {
    wait_for_database(pool, READY_ATTEMPTS, RETRY_DELAY).await?;

    let scripts = discover_scripts(dir)?;
    info!("found {} migration scripts in {}", scripts.len(), dir.display());

    for path in &scripts {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("<unnamed>")
            .to_string();
        let sql = fs::read_to_string(path)?;

        info!("applying {name}");
        apply_script(pool, &name, &sql).await?;
    }

    info!("migrations done");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn scripts_sorted_lexicographically_by_filename() {
        let dir = tempfile::tempdir().unwrap();

        for name in ["0010_later.sql", "0002_second.sql", "0001_first.sql"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let names: Vec<String> = discover_scripts(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, ["0001_first.sql", "0002_second.sql", "0010_later.sql"]);
    }

    #[test]
    fn non_sql_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();

        File::create(dir.path().join("0001_schema.sql")).unwrap();
        File::create(dir.path().join("README.md")).unwrap();
        File::create(dir.path().join("0002_backup.sql.bak")).unwrap();

        let scripts = discover_scripts(dir.path()).unwrap();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].ends_with("0001_schema.sql"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        assert!(matches!(
            discover_scripts(&missing),
            Err(MigrateError::Io(_))
        ));
    }
}
