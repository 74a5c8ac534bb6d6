use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::application::use_cases::domain::DomainUseCases;
use crate::application::use_cases::notification::NotificationUseCases;

const CHECK_BATCH_SIZE: i64 = 100;

/// Periodically refreshes registry data for domains whose last check has
/// aged out, and fans expiry alerts out through the notification use cases.
pub async fn run_expiry_monitor_loop(
    domain_uc: Arc<DomainUseCases>,
    notification_uc: Arc<NotificationUseCases>,
    poll_secs: u64,
    refresh_hours: i64,
) {
    let mut ticker = interval(Duration::from_secs(poll_secs));

    info!(
        "Expiry monitor started (polling every {}s, refresh window {}h)",
        poll_secs, refresh_hours
    );

    loop {
        ticker.tick().await;

        let cutoff = Utc::now().naive_utc() - chrono::Duration::hours(refresh_hours);
        let due = match domain_uc.due_for_check(cutoff, CHECK_BATCH_SIZE).await {
            Ok(domains) => domains,
            Err(e) => {
                error!(error = ?e, "Failed to fetch domains due for a check");
                continue;
            }
        };

        if due.is_empty() {
            continue;
        }
        info!(count = due.len(), "Refreshing due domains");

        for domain in due {
            match domain_uc.run_registry_check(&domain).await {
                Ok(outcome) => {
                    if outcome.domain.status != outcome.previous_status {
                        info!(
                            domain = %outcome.domain.name,
                            from = outcome.previous_status.as_str(),
                            to = outcome.domain.status.as_str(),
                            "Domain status changed"
                        );
                    }
                    if let Err(e) = notification_uc
                        .notify_domain_event(&outcome.domain, outcome.previous_status)
                        .await
                    {
                        error!(
                            domain = %outcome.domain.name,
                            error = ?e,
                            "Failed to record expiry notification"
                        );
                    }
                }
                Err(e) => {
                    warn!(domain = %domain.name, error = ?e, "Registry check failed");
                }
            }
        }
    }
}
