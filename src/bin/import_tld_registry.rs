//! TLD registry import CLI, meant for cron:
//!
//! ```text
//! import_tld_registry [--rdap-only | --whois-only | --check-updates]
//! ```
//!
//! Imports TLD metadata from the IANA TLD list, the RDAP bootstrap registry,
//! and IANA WHOIS referrals. Progress is checkpointed to `tld_import_logs`,
//! the same table the HTTP progress endpoint polls.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use env_helpers::get_env_default;
use tracing_subscriber::EnvFilter;

use domwatch::application::use_cases::tld::{TldDirectoryClient, TldRepo, TldUseCases};
use domwatch::domain::entities::tld::{ImportMode, ImportStatus};
use domwatch::adapters::registry::iana::IanaDirectoryClient;
use domwatch::infra::postgres_persistence;

#[derive(Parser, Debug)]
#[command(name = "import_tld_registry", about = "Import TLD registry metadata from IANA")]
struct Cli {
    /// Only import RDAP bootstrap URLs (skip WHOIS referral queries).
    #[arg(long, conflicts_with_all = ["whois_only", "check_updates"])]
    rdap_only: bool,

    /// Only import WHOIS referral servers (skip RDAP bootstrap).
    #[arg(long, conflicts_with_all = ["rdap_only", "check_updates"])]
    whois_only: bool,

    /// Refresh already-imported TLDs only; never add new entries.
    #[arg(long, conflicts_with_all = ["rdap_only", "whois_only"])]
    check_updates: bool,
}

impl Cli {
    fn mode(&self) -> ImportMode {
        if self.check_updates {
            ImportMode::CheckUpdates
        } else if self.rdap_only {
            ImportMode::RdapOnly
        } else if self.whois_only {
            ImportMode::WhoisOnly
        } else {
            ImportMode::Full
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "domwatch=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mode = cli.mode();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set (env or .env)")?;
    let whois_delay_ms: u64 = get_env_default("WHOIS_DELAY_MS", 500);

    let persistence = Arc::new(postgres_persistence(&database_url).await?);
    let tld_repo = persistence as Arc<dyn TldRepo>;
    let directory: Arc<dyn TldDirectoryClient> =
        Arc::new(IanaDirectoryClient::new(reqwest::Client::new()));

    let tld_uc = TldUseCases::new(tld_repo, directory, whois_delay_ms);

    let log = tld_uc
        .start_import(mode)
        .await
        .map_err(|e| anyhow::anyhow!("could not start import: {e}"))?;
    println!("Import {} started (mode: {})", log.id, mode.as_ref());

    let finished = tld_uc
        .run_import(log.id, mode)
        .await
        .map_err(|e| anyhow::anyhow!("import crashed: {e}"))?;

    println!(
        "Import {}: {} (processed {}/{}, imported {}, updated {}, failed {})",
        finished.id,
        finished.status.as_ref(),
        finished.processed,
        finished.total,
        finished.imported,
        finished.updated,
        finished.failed,
    );

    if finished.status != ImportStatus::Completed {
        anyhow::bail!(
            "import failed: {}",
            finished.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
