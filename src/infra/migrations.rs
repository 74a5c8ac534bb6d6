use sqlx::PgPool;
use tracing::{info, warn};

/// The fixed, ordered migration list. Files run sequentially; the whole list
/// is replayed on every run, so each file is either idempotent by
/// construction (`IF NOT EXISTS`) or covered by the benign-error classes
/// below.
pub struct MigrationFile {
    pub name: &'static str,
    pub sql: &'static str,
}

macro_rules! migration {
    ($name:literal) => {
        MigrationFile {
            name: $name,
            sql: include_str!(concat!("../../migrations/", $name)),
        }
    };
}

pub const MIGRATIONS: &[MigrationFile] = &[
    migration!("001_create_users.sql"),
    migration!("002_create_magic_links.sql"),
    migration!("003_create_notification_groups.sql"),
    migration!("004_create_notification_channels.sql"),
    migration!("005_create_domains.sql"),
    migration!("006_create_notifications.sql"),
    migration!("007_create_notification_deliveries.sql"),
    migration!("008_create_tld_registry.sql"),
    migration!("009_create_tld_import_logs.sql"),
    migration!("010_create_settings.sql"),
    migration!("011_add_domain_fields.sql"),
    migration!("012_extend_channel_kind.sql"),
];

#[derive(Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    Applied,
    Skipped(String),
}

pub struct MigrationReport {
    pub name: &'static str,
    pub outcome: MigrationOutcome,
}

/// Two error classes are benign on re-runs and skip the file: adding a
/// column that already exists, and adding an enum label that already exists.
/// Everything else aborts the run.
pub fn is_benign_migration_error(message: &str) -> bool {
    let msg = message.to_lowercase();
    if !msg.contains("already exists") {
        return false;
    }
    msg.contains("column") || msg.contains("enum label")
}

pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<Vec<MigrationReport>> {
    let mut reports = Vec::with_capacity(MIGRATIONS.len());

    for file in MIGRATIONS {
        match sqlx::raw_sql(file.sql).execute(pool).await {
            Ok(_) => {
                info!(file = file.name, "Migration applied");
                reports.push(MigrationReport {
                    name: file.name,
                    outcome: MigrationOutcome::Applied,
                });
            }
            Err(e) => {
                let message = e.to_string();
                if is_benign_migration_error(&message) {
                    warn!(file = file.name, error = %message, "Migration skipped");
                    reports.push(MigrationReport {
                        name: file.name,
                        outcome: MigrationOutcome::Skipped(message),
                    });
                } else {
                    anyhow::bail!("migration {} failed: {message}", file.name);
                }
            }
        }
    }
    Ok(reports)
}
