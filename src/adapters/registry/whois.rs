use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::app_error::{AppError, AppResult};
use crate::application::use_cases::domain::RegistryInfo;

const WHOIS_PORT: u16 = 43;
const RESPONSE_CAP: usize = 64 * 1024;

static EXPIRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:registry expiry date|registrar registration expiration date|expiration date|expiry date|expire(?:s)?(?: date| on)?|paid-till)[ \t]*:[ \t]*(.+?)[ \t]*$",
    )
    .expect("expiry regex")
});

static CREATED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:creation date|created(?: on)?|registered(?: on)?)[ \t]*:[ \t]*(.+?)[ \t]*$",
    )
    .expect("created regex")
});

static REGISTRAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[ \t]*registrar[ \t]*:[ \t]*(.+?)[ \t]*$").expect("registrar regex"));

static NS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:name server|nserver)[ \t]*:[ \t]*(\S+)").expect("ns regex")
});

/// Plain port-43 WHOIS query client.
pub struct WhoisClient {
    timeout: Duration,
}

impl WhoisClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn query(&self, server: &str, query: &str) -> AppResult<String> {
        debug!(server = %server, query = %query, "WHOIS query");

        let addr = if server.contains(':') {
            server.to_string()
        } else {
            format!("{server}:{WHOIS_PORT}")
        };

        let response = tokio::time::timeout(self.timeout, async {
            let mut stream = TcpStream::connect(&addr)
                .await
                .map_err(|e| AppError::Internal(format!("WHOIS connect failed: {e}")))?;
            stream
                .write_all(format!("{query}\r\n").as_bytes())
                .await
                .map_err(|e| AppError::Internal(format!("WHOIS write failed: {e}")))?;

            let mut buf = Vec::with_capacity(4096);
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream
                    .read(&mut chunk)
                    .await
                    .map_err(|e| AppError::Internal(format!("WHOIS read failed: {e}")))?;
                if n == 0 {
                    break;
                }
                let take = n.min(RESPONSE_CAP - buf.len());
                buf.extend_from_slice(&chunk[..take]);
                if buf.len() >= RESPONSE_CAP {
                    break;
                }
            }
            Ok::<_, AppError>(String::from_utf8_lossy(&buf).into_owned())
        })
        .await
        .map_err(|_| AppError::Internal(format!("WHOIS query to {server} timed out")))??;

        Ok(response)
    }
}

/// Pull registration metadata out of a raw WHOIS response.
///
/// WHOIS has no standard format; the patterns cover the common registry
/// dialects (gTLD "Registry Expiry Date", .uk "Expiry date", .ru
/// "paid-till", and so on). Fields that match nothing stay None.
pub fn parse_whois_response(text: &str) -> RegistryInfo {
    let mut info = RegistryInfo::default();

    if let Some(caps) = EXPIRY_RE.captures(text) {
        info.expires_at = parse_whois_datetime(&caps[1]);
    }
    if let Some(caps) = CREATED_RE.captures(text) {
        info.registered_at = parse_whois_datetime(&caps[1]);
    }
    if let Some(caps) = REGISTRAR_RE.captures(text) {
        let name = caps[1].trim();
        if !name.is_empty() {
            info.registrar = Some(name.to_string());
        }
    }
    for caps in NS_RE.captures_iter(text) {
        let ns = caps[1].trim_end_matches('.').to_lowercase();
        if !ns.is_empty() && !info.nameservers.contains(&ns) {
            info.nameservers.push(ns);
        }
    }

    info
}

/// WHOIS servers disagree on date formats; try the dialects in turn.
pub fn parse_whois_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%d %H:%M:%S",
        "%Y.%m.%d %H:%M:%S",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%b-%Y", "%d.%m.%Y", "%Y.%m.%d", "%d/%m/%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    None
}
