//! Migration/bootstrap CLI: provisions `APP_ENCRYPTION_KEY` on first run,
//! then applies the fixed, ordered migration list against `DATABASE_URL`.
//!
//! Re-running is safe: base tables are created `IF NOT EXISTS`, and the two
//! known re-run error classes (duplicate column, duplicate enum label) are
//! skipped with a warning. Any other database error aborts with a non-zero
//! exit status.

use std::path::Path;

use anyhow::Context;
use dotenvy::dotenv;

use domwatch::infra::{
    db::init_db,
    env_file::ensure_encryption_key,
    migrations::{MigrationOutcome, run_migrations},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let env_path = Path::new(".env");
    let generated = ensure_encryption_key(env_path)
        .context("failed to provision APP_ENCRYPTION_KEY")?;
    if generated {
        println!("Generated APP_ENCRYPTION_KEY and wrote it to {}", env_path.display());
    } else {
        println!("APP_ENCRYPTION_KEY already present, leaving it untouched");
    }

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set (env or .env)")?;
    let pool = init_db(&database_url).await?;

    let reports = run_migrations(&pool).await?;

    let mut applied = 0;
    let mut skipped = 0;
    for report in &reports {
        match &report.outcome {
            MigrationOutcome::Applied => {
                applied += 1;
                println!("applied  {}", report.name);
            }
            MigrationOutcome::Skipped(reason) => {
                skipped += 1;
                println!("skipped  {}  ({reason})", report.name);
            }
        }
    }
    println!("Done: {applied} applied, {skipped} skipped");

    Ok(())
}
