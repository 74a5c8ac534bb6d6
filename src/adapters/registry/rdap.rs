use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::debug;

use crate::app_error::{AppError, AppResult};
use crate::application::use_cases::domain::RegistryInfo;

/// RDAP domain lookup against a bootstrap base URL
/// (e.g. `https://rdap.verisign.com/com/v1/`).
pub struct RdapClient {
    client: reqwest::Client,
}

#[derive(Debug, Default, Deserialize)]
struct RdapDomain {
    #[serde(default)]
    events: Vec<RdapEvent>,
    #[serde(default)]
    entities: Vec<RdapEntity>,
    #[serde(default)]
    nameservers: Vec<RdapNameserver>,
}

#[derive(Debug, Deserialize)]
struct RdapEvent {
    #[serde(rename = "eventAction")]
    event_action: String,
    #[serde(rename = "eventDate")]
    event_date: String,
}

#[derive(Debug, Deserialize)]
struct RdapEntity {
    #[serde(default)]
    roles: Vec<String>,
    #[serde(rename = "vcardArray", default)]
    vcard_array: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RdapNameserver {
    #[serde(rename = "ldhName", default)]
    ldh_name: String,
}

impl RdapClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn lookup(&self, base_url: &str, domain: &str) -> AppResult<RegistryInfo> {
        let url = format!("{}domain/{}", ensure_trailing_slash(base_url), domain);
        debug!(url = %url, "RDAP lookup");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/rdap+json")
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("RDAP request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound);
        }
        let doc: RdapDomain = response
            .error_for_status()
            .map_err(|e| AppError::Internal(format!("RDAP status: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("RDAP body: {e}")))?;

        Ok(extract_info(&doc))
    }
}

fn ensure_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

fn extract_info(doc: &RdapDomain) -> RegistryInfo {
    let mut info = RegistryInfo::default();

    for event in &doc.events {
        let parsed = parse_rdap_date(&event.event_date);
        match event.event_action.as_str() {
            "expiration" => info.expires_at = parsed.or(info.expires_at),
            "registration" => info.registered_at = parsed.or(info.registered_at),
            _ => {}
        }
    }

    info.registrar = doc
        .entities
        .iter()
        .find(|e| e.roles.iter().any(|r| r == "registrar"))
        .and_then(|e| vcard_fn(&e.vcard_array));

    info.nameservers = doc
        .nameservers
        .iter()
        .filter(|ns| !ns.ldh_name.is_empty())
        .map(|ns| ns.ldh_name.to_lowercase())
        .collect();

    info
}

fn parse_rdap_date(raw: &str) -> Option<NaiveDateTime> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_utc())
        .ok()
}

/// The formal name from a jCard: `["vcard", [ ..., ["fn", {}, "text", "Name"], ... ]]`.
fn vcard_fn(vcard: &serde_json::Value) -> Option<String> {
    let items = vcard.as_array()?.get(1)?.as_array()?;
    for item in items {
        let parts = item.as_array()?;
        if parts.first()?.as_str()? == "fn" {
            let name = parts.get(3)?.as_str()?.trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}
