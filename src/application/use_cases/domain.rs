use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::use_cases::notification::NotificationGroupRepo;
use crate::application::use_cases::settings::SettingsUseCases;
use crate::application::use_cases::tld::TldRepo;
use crate::application::validators::{is_valid_domain_name, tld_of};
use crate::domain::entities::domain::{DomainStatus, derive_status};

#[derive(Debug, Clone)]
pub struct DomainProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub registrar: Option<String>,
    pub registered_at: Option<NaiveDateTime>,
    pub expires_at: Option<NaiveDateTime>,
    pub last_checked_at: Option<NaiveDateTime>,
    pub status: DomainStatus,
    pub nameservers: Vec<String>,
    pub notification_group_id: Option<Uuid>,
    pub auto_renew: bool,
    pub notes: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Registration metadata fetched from RDAP or WHOIS.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryInfo {
    pub expires_at: Option<NaiveDateTime>,
    pub registered_at: Option<NaiveDateTime>,
    pub registrar: Option<String>,
    pub nameservers: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DomainListFilter {
    pub status: Option<DomainStatus>,
    pub q: Option<String>,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateDomainInput {
    pub registrar: Option<String>,
    pub expires_at: Option<NaiveDateTime>,
    pub auto_renew: Option<bool>,
    pub notes: Option<String>,
    pub notification_group_id: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct PortfolioStats {
    pub total: i64,
    pub active: i64,
    pub expiring: i64,
    pub expired: i64,
    pub unknown: i64,
}

#[derive(Debug, Serialize)]
pub struct BulkAddOutcome {
    pub name: String,
    pub id: Option<Uuid>,
    pub error: Option<String>,
}

#[async_trait]
pub trait DomainRepo: Send + Sync {
    async fn create(&self, user_id: Uuid, name: &str) -> AppResult<DomainProfile>;
    async fn get_by_id(&self, domain_id: Uuid) -> AppResult<Option<DomainProfile>>;
    async fn list_by_user(
        &self,
        user_id: Uuid,
        filter: &DomainListFilter,
    ) -> AppResult<(Vec<DomainProfile>, i64)>;
    async fn suggest(&self, user_id: Uuid, prefix: &str, limit: i64) -> AppResult<Vec<String>>;
    async fn update(&self, domain_id: Uuid, input: &UpdateDomainInput) -> AppResult<DomainProfile>;
    async fn set_status(&self, domain_id: Uuid, status: DomainStatus) -> AppResult<()>;
    async fn record_check(
        &self,
        domain_id: Uuid,
        info: &RegistryInfo,
        nameservers: &[String],
        status: DomainStatus,
        checked_at: NaiveDateTime,
    ) -> AppResult<DomainProfile>;
    async fn touch_checked(&self, domain_id: Uuid, checked_at: NaiveDateTime) -> AppResult<()>;
    async fn delete(&self, domain_id: Uuid) -> AppResult<()>;
    async fn assign_group(&self, domain_ids: &[Uuid], group_id: Option<Uuid>) -> AppResult<u64>;
    async fn due_for_check(&self, cutoff: NaiveDateTime, limit: i64)
    -> AppResult<Vec<DomainProfile>>;
    async fn stats_by_user(&self, user_id: Uuid) -> AppResult<PortfolioStats>;
}

/// Fetches registration data for a domain, given whatever registry endpoints
/// are known for its TLD.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn lookup(
        &self,
        domain: &str,
        rdap_url: Option<&str>,
        whois_server: Option<&str>,
    ) -> AppResult<RegistryInfo>;
}

#[async_trait]
pub trait NsLookup: Send + Sync {
    async fn lookup_ns(&self, domain: &str) -> AppResult<Vec<String>>;
}

/// Result of a monitor pass over one domain.
pub struct CheckOutcome {
    pub domain: DomainProfile,
    pub previous_status: DomainStatus,
}

#[derive(Clone)]
pub struct DomainUseCases {
    repo: Arc<dyn DomainRepo>,
    groups: Arc<dyn NotificationGroupRepo>,
    tlds: Arc<dyn TldRepo>,
    registry: Arc<dyn RegistryClient>,
    ns: Arc<dyn NsLookup>,
    settings: Arc<SettingsUseCases>,
}

impl DomainUseCases {
    pub fn new(
        repo: Arc<dyn DomainRepo>,
        groups: Arc<dyn NotificationGroupRepo>,
        tlds: Arc<dyn TldRepo>,
        registry: Arc<dyn RegistryClient>,
        ns: Arc<dyn NsLookup>,
        settings: Arc<SettingsUseCases>,
    ) -> Self {
        Self {
            repo,
            groups,
            tlds,
            registry,
            ns,
            settings,
        }
    }

    #[instrument(skip(self))]
    pub async fn add_domain(&self, user_id: Uuid, name: &str) -> AppResult<DomainProfile> {
        let normalized = name.trim().trim_end_matches('.').to_lowercase();
        if !is_valid_domain_name(&normalized) {
            return Err(AppError::InvalidInput(format!(
                "'{normalized}' is not a valid domain name"
            )));
        }
        self.repo.create(user_id, &normalized).await
    }

    #[instrument(skip(self))]
    pub async fn bulk_add(&self, user_id: Uuid, names: &[String]) -> Vec<BulkAddOutcome> {
        let mut outcomes = Vec::with_capacity(names.len());
        for name in names {
            match self.add_domain(user_id, name).await {
                Ok(d) => outcomes.push(BulkAddOutcome {
                    name: d.name,
                    id: Some(d.id),
                    error: None,
                }),
                Err(e) => outcomes.push(BulkAddOutcome {
                    name: name.clone(),
                    id: None,
                    error: Some(e.to_string()),
                }),
            }
        }
        outcomes
    }

    #[instrument(skip(self))]
    pub async fn list_domains(
        &self,
        user_id: Uuid,
        filter: &DomainListFilter,
    ) -> AppResult<(Vec<DomainProfile>, i64)> {
        self.repo.list_by_user(user_id, filter).await
    }

    #[instrument(skip(self))]
    pub async fn suggest(&self, user_id: Uuid, prefix: &str) -> AppResult<Vec<String>> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return Ok(vec![]);
        }
        self.repo.suggest(user_id, &prefix, 10).await
    }

    #[instrument(skip(self))]
    pub async fn get_domain(&self, user_id: Uuid, domain_id: Uuid) -> AppResult<DomainProfile> {
        let domain = self
            .repo
            .get_by_id(domain_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if domain.user_id != user_id {
            return Err(AppError::NotFound);
        }
        Ok(domain)
    }

    #[instrument(skip(self))]
    pub async fn update_domain(
        &self,
        user_id: Uuid,
        domain_id: Uuid,
        mut input: UpdateDomainInput,
    ) -> AppResult<DomainProfile> {
        self.get_domain(user_id, domain_id).await?;

        if let Some(Some(group_id)) = input.notification_group_id {
            self.assert_group_owned(user_id, group_id).await?;
        }
        if let Some(registrar) = &input.registrar {
            let trimmed = registrar.trim().to_string();
            input.registrar = if trimmed.is_empty() { None } else { Some(trimmed) };
        }

        let updated = self.repo.update(domain_id, &input).await?;

        // A manual expiry edit changes the derived status immediately.
        if input.expires_at.is_some() {
            let threshold = self.settings.alert_threshold_days().await;
            let status = derive_status(updated.expires_at, threshold, Utc::now().naive_utc());
            if status != updated.status {
                self.repo.set_status(domain_id, status).await?;
                return self.get_domain(user_id, domain_id).await;
            }
        }
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_domain(&self, user_id: Uuid, domain_id: Uuid) -> AppResult<()> {
        self.get_domain(user_id, domain_id).await?;
        self.repo.delete(domain_id).await
    }

    #[instrument(skip(self))]
    pub async fn bulk_delete(&self, user_id: Uuid, domain_ids: &[Uuid]) -> AppResult<u64> {
        let mut deleted = 0;
        for id in domain_ids {
            if self.delete_domain(user_id, *id).await.is_ok() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    #[instrument(skip(self))]
    pub async fn bulk_assign_group(
        &self,
        user_id: Uuid,
        domain_ids: &[Uuid],
        group_id: Option<Uuid>,
    ) -> AppResult<u64> {
        if let Some(group_id) = group_id {
            self.assert_group_owned(user_id, group_id).await?;
        }
        let mut owned = Vec::with_capacity(domain_ids.len());
        for id in domain_ids {
            if self.get_domain(user_id, *id).await.is_ok() {
                owned.push(*id);
            }
        }
        if owned.is_empty() {
            return Ok(0);
        }
        self.repo.assign_group(&owned, group_id).await
    }

    #[instrument(skip(self))]
    pub async fn portfolio_stats(&self, user_id: Uuid) -> AppResult<PortfolioStats> {
        self.repo.stats_by_user(user_id).await
    }

    /// Force a registry lookup for a domain the caller owns.
    #[instrument(skip(self))]
    pub async fn refresh_domain(
        &self,
        user_id: Uuid,
        domain_id: Uuid,
    ) -> AppResult<DomainProfile> {
        let domain = self.get_domain(user_id, domain_id).await?;
        let outcome = self.run_registry_check(&domain).await?;
        Ok(outcome.domain)
    }

    /// Domains whose last check is older than the cutoff (or never checked).
    pub async fn due_for_check(
        &self,
        cutoff: NaiveDateTime,
        limit: i64,
    ) -> AppResult<Vec<DomainProfile>> {
        self.repo.due_for_check(cutoff, limit).await
    }

    /// Look up the domain's registry data and persist the result.
    ///
    /// A failed lookup is not an error for the caller: the check timestamp
    /// still advances so the monitor does not hammer a broken TLD, and the
    /// previously known expiry is kept.
    #[instrument(skip(self), fields(domain = %domain.name))]
    pub async fn run_registry_check(&self, domain: &DomainProfile) -> AppResult<CheckOutcome> {
        let now = Utc::now().naive_utc();
        let tld = tld_of(&domain.name)
            .ok_or_else(|| AppError::InvalidInput("Domain has no TLD".into()))?;

        let entry = self.tlds.get_by_tld(tld).await?;
        let (rdap_url, whois_server) = match &entry {
            Some(e) => (e.rdap_url.as_deref(), e.whois_server.as_deref()),
            None => (None, None),
        };

        let info = match self
            .registry
            .lookup(&domain.name, rdap_url, whois_server)
            .await
        {
            Ok(info) => info,
            Err(e) => {
                warn!(error = ?e, "Registry lookup failed");
                self.repo.touch_checked(domain.id, now).await?;
                let mut unchanged = domain.clone();
                unchanged.last_checked_at = Some(now);
                return Ok(CheckOutcome {
                    previous_status: domain.status,
                    domain: unchanged,
                });
            }
        };

        let nameservers = match self.ns.lookup_ns(&domain.name).await {
            Ok(ns) if !ns.is_empty() => ns,
            _ => info.nameservers.clone(),
        };

        // Keep a previously known expiry if this source returned none.
        let effective_expiry = info.expires_at.or(domain.expires_at);
        let threshold = self.settings.alert_threshold_days().await;
        let status = derive_status(effective_expiry, threshold, now);

        let merged = RegistryInfo {
            expires_at: effective_expiry,
            registered_at: info.registered_at.or(domain.registered_at),
            registrar: info.registrar.or_else(|| domain.registrar.clone()),
            nameservers: vec![],
        };
        let updated = self
            .repo
            .record_check(domain.id, &merged, &nameservers, status, now)
            .await?;

        Ok(CheckOutcome {
            previous_status: domain.status,
            domain: updated,
        })
    }

    async fn assert_group_owned(&self, user_id: Uuid, group_id: Uuid) -> AppResult<()> {
        match self.groups.get_group(group_id).await? {
            Some(g) if g.user_id == user_id => Ok(()),
            _ => Err(AppError::InvalidInput("Unknown notification group".into())),
        }
    }
}
