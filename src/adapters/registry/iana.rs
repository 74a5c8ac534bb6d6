use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::app_error::{AppError, AppResult};
use crate::application::use_cases::tld::TldDirectoryClient;

use super::whois::WhoisClient;

const TLD_LIST_URL: &str = "https://data.iana.org/TLD/tlds-alpha-by-domain.txt";
const RDAP_BOOTSTRAP_URL: &str = "https://data.iana.org/rdap/dns.json";
const IANA_WHOIS_SERVER: &str = "whois.iana.org";
const WHOIS_TIMEOUT_SECS: u64 = 10;

static REFERRAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:whois|refer)[ \t]*:[ \t]*(\S+)").expect("referral regex")
});

/// RDAP bootstrap registry file: `services` pairs TLD lists with base URLs.
#[derive(Debug, Deserialize)]
struct RdapBootstrap {
    #[serde(default)]
    services: Vec<(Vec<String>, Vec<String>)>,
}

/// IANA-backed implementation of the TLD directory.
pub struct IanaDirectoryClient {
    http: reqwest::Client,
    whois: WhoisClient,
}

impl IanaDirectoryClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            whois: WhoisClient::new(Duration::from_secs(WHOIS_TIMEOUT_SECS)),
        }
    }
}

#[async_trait]
impl TldDirectoryClient for IanaDirectoryClient {
    async fn fetch_tld_list(&self) -> AppResult<Vec<String>> {
        let body = self
            .http
            .get(TLD_LIST_URL)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("TLD list fetch failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Internal(format!("TLD list status: {e}")))?
            .text()
            .await
            .map_err(|e| AppError::Internal(format!("TLD list body: {e}")))?;

        let tlds = parse_tld_list(&body);
        debug!(count = tlds.len(), "Fetched IANA TLD list");
        Ok(tlds)
    }

    async fn fetch_rdap_bootstrap(&self) -> AppResult<HashMap<String, String>> {
        let bootstrap: RdapBootstrap = self
            .http
            .get(RDAP_BOOTSTRAP_URL)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("RDAP bootstrap fetch failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Internal(format!("RDAP bootstrap status: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("RDAP bootstrap body: {e}")))?;

        let map = bootstrap_to_map(bootstrap.services);
        debug!(count = map.len(), "Fetched RDAP bootstrap map");
        Ok(map)
    }

    async fn whois_referral(&self, tld: &str) -> AppResult<Option<String>> {
        let response = self.whois.query(IANA_WHOIS_SERVER, tld).await?;
        Ok(parse_whois_referral(&response))
    }
}

fn parse_tld_list(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| l.to_lowercase())
        .collect()
}

fn bootstrap_to_map(services: Vec<(Vec<String>, Vec<String>)>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for (tlds, urls) in services {
        // RFC 9224 lists the preferred (https) URL first.
        let Some(url) = urls.first() else { continue };
        for tld in tlds {
            map.insert(tld.to_lowercase(), url.clone());
        }
    }
    map
}

fn parse_whois_referral(response: &str) -> Option<String> {
    REFERRAL_RE
        .captures(response)
        .map(|caps| caps[1].to_lowercase())
}
