pub mod iana;
pub mod rdap;
pub mod whois;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::app_error::{AppError, AppResult};
use crate::application::use_cases::domain::{RegistryClient, RegistryInfo};

use rdap::RdapClient;
use whois::{WhoisClient, parse_whois_response};

const WHOIS_TIMEOUT_SECS: u64 = 10;

/// Production registry client: RDAP when the TLD has a bootstrap URL, WHOIS
/// referral otherwise. RDAP errors fall through to WHOIS when both are known.
pub struct HttpRegistryClient {
    rdap: RdapClient,
    whois: WhoisClient,
}

impl HttpRegistryClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            rdap: RdapClient::new(http),
            whois: WhoisClient::new(Duration::from_secs(WHOIS_TIMEOUT_SECS)),
        }
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn lookup(
        &self,
        domain: &str,
        rdap_url: Option<&str>,
        whois_server: Option<&str>,
    ) -> AppResult<RegistryInfo> {
        if let Some(base_url) = rdap_url {
            match self.rdap.lookup(base_url, domain).await {
                Ok(info) => return Ok(info),
                Err(AppError::NotFound) => return Err(AppError::NotFound),
                Err(e) if whois_server.is_some() => {
                    warn!(domain = %domain, error = ?e, "RDAP lookup failed, falling back to WHOIS");
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(server) = whois_server {
            let response = self.whois.query(server, domain).await?;
            debug!(domain = %domain, bytes = response.len(), "WHOIS response received");
            return Ok(parse_whois_response(&response));
        }

        Err(AppError::InvalidInput(
            "No registry endpoint known for this TLD; run a TLD registry import first".into(),
        ))
    }
}
