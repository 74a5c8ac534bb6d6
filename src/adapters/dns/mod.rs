use std::net::SocketAddr;

use async_trait::async_trait;
use hickory_resolver::TokioResolver;
use hickory_resolver::config::{NameServerConfig, ResolverConfig};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::proto::xfer::Protocol;
use tracing::{debug, warn};

use crate::app_error::AppResult;
use crate::application::use_cases::domain::NsLookup;

/// NS-record snapshots for tracked domains, so nameserver moves show up in
/// the portfolio without waiting for the next registry refresh.
pub struct HickoryNsLookup {
    resolver: TokioResolver,
}

impl HickoryNsLookup {
    /// Create resolver using system DNS configuration.
    pub fn new() -> Self {
        let resolver = TokioResolver::builder_tokio().unwrap().build();
        Self { resolver }
    }

    /// Create resolver pointing to a specific DNS server (for local dev).
    pub fn with_nameserver(addr: SocketAddr) -> Self {
        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig::new(addr, Protocol::Udp));

        let resolver =
            TokioResolver::builder_with_config(config, TokioConnectionProvider::default()).build();
        Self { resolver }
    }
}

impl Default for HickoryNsLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NsLookup for HickoryNsLookup {
    async fn lookup_ns(&self, domain: &str) -> AppResult<Vec<String>> {
        // Append trailing dot to make it an FQDN and prevent search domain appending
        let fqdn = if domain.ends_with('.') {
            domain.to_string()
        } else {
            format!("{}.", domain)
        };

        match self.resolver.lookup(&fqdn, RecordType::NS).await {
            Ok(lookup) => {
                let mut servers: Vec<String> = lookup
                    .records()
                    .iter()
                    .filter_map(|record| record.data().as_ns())
                    .map(|ns| ns.to_string().trim_end_matches('.').to_lowercase())
                    .collect();
                servers.sort();
                servers.dedup();
                debug!(domain = %domain, count = servers.len(), "NS lookup");
                Ok(servers)
            }
            Err(e) => {
                warn!(domain = %domain, error = %e, "NS lookup failed");
                Ok(vec![])
            }
        }
    }
}
