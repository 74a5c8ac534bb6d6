use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::application::use_cases::auth::EmailSender;
use crate::application::use_cases::notification::{DeliveryJob, NotificationUseCases};
use crate::domain::entities::notification::ChannelKind;
use crate::infra::signer::sign_delivery_payload;

const POLL_INTERVAL_SECS: u64 = 5;
const STALE_CHECK_INTERVAL_SECS: u64 = 60;
const STALE_AFTER_MINS: i64 = 10;
const BATCH_SIZE: i64 = 50;
const MAX_CONCURRENT_DELIVERIES: usize = 10;
const HTTP_TIMEOUT_SECS: u64 = 10;
const ERROR_CAP: usize = 1024;

/// Drains the notification delivery queue: claims pending rows in batches
/// and sends each through its channel with bounded concurrency.
pub async fn run_delivery_loop(
    notification_uc: Arc<NotificationUseCases>,
    email: Arc<dyn EmailSender>,
) {
    let mut delivery_ticker = interval(Duration::from_secs(POLL_INTERVAL_SECS));
    let mut stale_ticker = interval(Duration::from_secs(STALE_CHECK_INTERVAL_SECS));

    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_DELIVERIES));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("failed to build reqwest client");

    info!(
        "Delivery worker started (polling every {}s, max {} concurrent)",
        POLL_INTERVAL_SECS, MAX_CONCURRENT_DELIVERIES
    );

    loop {
        tokio::select! {
            _ = delivery_ticker.tick() => {
                process_batch(&notification_uc, &email, &client, &semaphore).await;
            }
            _ = stale_ticker.tick() => {
                release_stale(&notification_uc).await;
            }
        }
    }
}

async fn process_batch(
    notification_uc: &Arc<NotificationUseCases>,
    email: &Arc<dyn EmailSender>,
    client: &reqwest::Client,
    semaphore: &Arc<Semaphore>,
) {
    let jobs = match notification_uc.claim_pending_deliveries(BATCH_SIZE).await {
        Ok(jobs) => jobs,
        Err(e) => {
            error!(error = %e, "Failed to claim pending deliveries");
            return;
        }
    };

    if jobs.is_empty() {
        return;
    }

    info!(count = jobs.len(), "Processing notification deliveries");

    let mut handles = Vec::with_capacity(jobs.len());

    for job in jobs {
        let uc = Arc::clone(notification_uc);
        let email = Arc::clone(email);
        let client = client.clone();
        let sem = Arc::clone(semaphore);

        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await.expect("semaphore closed");
            deliver_one(&uc, &email, &client, &job).await;
        }));
    }

    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "Delivery task panicked");
        }
    }
}

async fn deliver_one(
    notification_uc: &NotificationUseCases,
    email: &Arc<dyn EmailSender>,
    client: &reqwest::Client,
    job: &DeliveryJob,
) {
    let result = match job.channel_kind {
        ChannelKind::Email => deliver_email(email, job).await,
        ChannelKind::Webhook => deliver_webhook(notification_uc, client, job).await,
    };

    match result {
        Ok(status) => {
            if let Err(e) = notification_uc
                .record_delivery_success(job.delivery_id, status)
                .await
            {
                error!(delivery_id = %job.delivery_id, error = %e, "Failed to record delivery success");
            }
        }
        Err(failure) => {
            let truncated: String = failure.error.chars().take(ERROR_CAP).collect();
            if let Err(e) = notification_uc
                .record_delivery_failure(
                    job.delivery_id,
                    job.attempt_count + 1,
                    failure.response_status,
                    Some(&truncated),
                    failure.terminal,
                )
                .await
            {
                error!(delivery_id = %job.delivery_id, error = %e, "Failed to record delivery failure");
            }
        }
    }
}

struct DeliveryFailure {
    response_status: Option<i32>,
    error: String,
    terminal: bool,
}

async fn deliver_email(
    email: &Arc<dyn EmailSender>,
    job: &DeliveryJob,
) -> Result<i32, DeliveryFailure> {
    let html = format!("<p>{}</p>", job.body);
    match email.send(&job.target, &job.subject, &html).await {
        Ok(()) => Ok(200),
        Err(e) => Err(DeliveryFailure {
            response_status: None,
            error: format!("email send failed: {e}"),
            terminal: false,
        }),
    }
}

async fn deliver_webhook(
    notification_uc: &NotificationUseCases,
    client: &reqwest::Client,
    job: &DeliveryJob,
) -> Result<i32, DeliveryFailure> {
    let secret = match &job.secret_encrypted {
        Some(encrypted) => match notification_uc.decrypt_channel_secret(encrypted) {
            Ok(s) => s,
            Err(e) => {
                return Err(DeliveryFailure {
                    response_status: None,
                    error: format!("internal: secret decryption failed: {e}"),
                    terminal: true,
                });
            }
        },
        None => {
            return Err(DeliveryFailure {
                response_status: None,
                error: "internal: webhook channel has no secret".into(),
                terminal: true,
            });
        }
    };

    if let Err(reason) = check_ssrf(&job.target).await {
        warn!(delivery_id = %job.delivery_id, url = %job.target, reason = %reason, "SSRF check failed");
        return Err(DeliveryFailure {
            response_status: None,
            error: format!("SSRF blocked: {reason}"),
            terminal: true,
        });
    }

    let payload = serde_json::json!({
        "notification_id": job.notification_id,
        "subject": job.subject,
        "body": job.body,
    })
    .to_string();

    let timestamp = chrono::Utc::now().timestamp();
    let signature = sign_delivery_payload(&secret, timestamp, &payload);

    let result = client
        .post(&job.target)
        .header("Content-Type", "application/json")
        .header("Domwatch-Signature", &signature)
        .header("Domwatch-Delivery-Id", job.delivery_id.to_string())
        .header("Domwatch-Timestamp", timestamp.to_string())
        .body(payload)
        .send()
        .await;

    match result {
        Ok(response) => {
            let status = response.status().as_u16() as i32;
            if (200..300).contains(&status) {
                Ok(status)
            } else {
                Err(DeliveryFailure {
                    response_status: Some(status),
                    error: format!("endpoint returned HTTP {status}"),
                    terminal: is_terminal_status(status),
                })
            }
        }
        Err(e) => Err(DeliveryFailure {
            response_status: None,
            error: format!("HTTP error: {e}"),
            terminal: false,
        }),
    }
}

fn is_terminal_status(status: i32) -> bool {
    // 4xx (client errors) are terminal, except retryable ones
    if (400..500).contains(&status) {
        // 408 Request Timeout, 409 Conflict, 429 Too Many Requests are retryable
        !matches!(status, 408 | 409 | 429)
    } else {
        false
    }
}

async fn check_ssrf(url: &str) -> Result<(), String> {
    let parsed = url::Url::parse(url).map_err(|e| format!("invalid URL: {}", e))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| "URL has no host".to_string())?;

    let port = parsed.port_or_known_default().unwrap_or(443);
    let addr_str = format!("{}:{}", host, port);

    let addrs: Vec<std::net::SocketAddr> = tokio::net::lookup_host(&addr_str)
        .await
        .map_err(|e| format!("DNS resolution failed: {}", e))?
        .collect();

    if addrs.is_empty() {
        return Err("DNS resolved to no addresses".to_string());
    }

    for addr in &addrs {
        if is_private_ip(&addr.ip()) {
            return Err(format!("resolved to private/reserved IP: {}", addr.ip()));
        }
    }

    Ok(())
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()           // 127.0.0.0/8
            || v4.is_private()         // 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
            || v4.is_link_local()      // 169.254.0.0/16
            || v4.is_broadcast()       // 255.255.255.255
            || v4.is_unspecified()     // 0.0.0.0
            || v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64 // 100.64.0.0/10 (CGNAT)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()           // ::1
            || v6.is_unspecified()     // ::
            // fc00::/7 (unique local)
            || (v6.segments()[0] & 0xfe00) == 0xfc00
            // fe80::/10 (link-local)
            || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

async fn release_stale(notification_uc: &NotificationUseCases) {
    match notification_uc
        .release_stale_deliveries(STALE_AFTER_MINS)
        .await
    {
        Ok(count) if count > 0 => {
            warn!(count, "Released stale deliveries");
        }
        Ok(_) => {}
        Err(e) => {
            error!(error = %e, "Failed to release stale deliveries");
        }
    }
}
