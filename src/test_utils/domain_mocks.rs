//! In-memory implementation of the domain repository trait.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::domain::{
        DomainListFilter, DomainProfile, DomainRepo, PortfolioStats, RegistryInfo,
        UpdateDomainInput,
    },
    domain::entities::domain::DomainStatus,
};

#[derive(Default)]
pub struct InMemoryDomainRepo {
    pub domains: Mutex<HashMap<Uuid, DomainProfile>>,
}

impl InMemoryDomainRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domains(domains: Vec<DomainProfile>) -> Self {
        let map: HashMap<Uuid, DomainProfile> = domains.into_iter().map(|d| (d.id, d)).collect();
        Self {
            domains: Mutex::new(map),
        }
    }

    pub fn seed(&self, domain: DomainProfile) {
        self.domains.lock().unwrap().insert(domain.id, domain);
    }

    pub fn get_all(&self) -> Vec<DomainProfile> {
        self.domains.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl DomainRepo for InMemoryDomainRepo {
    async fn create(&self, user_id: Uuid, name: &str) -> AppResult<DomainProfile> {
        let mut domains = self.domains.lock().unwrap();

        if domains
            .values()
            .any(|d| d.user_id == user_id && d.name == name)
        {
            return Err(AppError::InvalidInput(
                "A record with this value already exists".into(),
            ));
        }

        let now = Utc::now().naive_utc();
        let profile = DomainProfile {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            registrar: None,
            registered_at: None,
            expires_at: None,
            last_checked_at: None,
            status: DomainStatus::Unknown,
            nameservers: vec![],
            notification_group_id: None,
            auto_renew: false,
            notes: None,
            created_at: Some(now),
            updated_at: Some(now),
        };
        domains.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn get_by_id(&self, domain_id: Uuid) -> AppResult<Option<DomainProfile>> {
        Ok(self.domains.lock().unwrap().get(&domain_id).cloned())
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        filter: &DomainListFilter,
    ) -> AppResult<(Vec<DomainProfile>, i64)> {
        let domains = self.domains.lock().unwrap();
        let mut matched: Vec<DomainProfile> = domains
            .values()
            .filter(|d| d.user_id == user_id)
            .filter(|d| filter.status.is_none_or(|s| d.status == s))
            .filter(|d| {
                filter
                    .q
                    .as_deref()
                    .is_none_or(|q| d.name.contains(&q.to_lowercase()))
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| match (a.expires_at, b.expires_at) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.name.cmp(&b.name)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.name.cmp(&b.name),
        });

        let total = matched.len() as i64;
        let per_page = filter.per_page.clamp(1, 100) as usize;
        let start = ((filter.page.max(1) - 1) as usize) * per_page;
        let page: Vec<DomainProfile> = matched.into_iter().skip(start).take(per_page).collect();
        Ok((page, total))
    }

    async fn suggest(&self, user_id: Uuid, prefix: &str, limit: i64) -> AppResult<Vec<String>> {
        let domains = self.domains.lock().unwrap();
        let mut names: Vec<String> = domains
            .values()
            .filter(|d| d.user_id == user_id && d.name.starts_with(prefix))
            .map(|d| d.name.clone())
            .collect();
        names.sort();
        names.truncate(limit as usize);
        Ok(names)
    }

    async fn update(&self, domain_id: Uuid, input: &UpdateDomainInput) -> AppResult<DomainProfile> {
        let mut domains = self.domains.lock().unwrap();
        let domain = domains.get_mut(&domain_id).ok_or(AppError::NotFound)?;

        if let Some(registrar) = &input.registrar {
            domain.registrar = Some(registrar.clone());
        }
        if let Some(expires_at) = input.expires_at {
            domain.expires_at = Some(expires_at);
        }
        if let Some(auto_renew) = input.auto_renew {
            domain.auto_renew = auto_renew;
        }
        if let Some(notes) = &input.notes {
            domain.notes = Some(notes.clone());
        }
        if let Some(group_id) = input.notification_group_id {
            domain.notification_group_id = group_id;
        }
        domain.updated_at = Some(Utc::now().naive_utc());
        Ok(domain.clone())
    }

    async fn set_status(&self, domain_id: Uuid, status: DomainStatus) -> AppResult<()> {
        let mut domains = self.domains.lock().unwrap();
        let domain = domains.get_mut(&domain_id).ok_or(AppError::NotFound)?;
        domain.status = status;
        domain.updated_at = Some(Utc::now().naive_utc());
        Ok(())
    }

    async fn record_check(
        &self,
        domain_id: Uuid,
        info: &RegistryInfo,
        nameservers: &[String],
        status: DomainStatus,
        checked_at: NaiveDateTime,
    ) -> AppResult<DomainProfile> {
        let mut domains = self.domains.lock().unwrap();
        let domain = domains.get_mut(&domain_id).ok_or(AppError::NotFound)?;
        domain.registrar = info.registrar.clone();
        domain.registered_at = info.registered_at;
        domain.expires_at = info.expires_at;
        domain.nameservers = nameservers.to_vec();
        domain.status = status;
        domain.last_checked_at = Some(checked_at);
        domain.updated_at = Some(Utc::now().naive_utc());
        Ok(domain.clone())
    }

    async fn touch_checked(&self, domain_id: Uuid, checked_at: NaiveDateTime) -> AppResult<()> {
        let mut domains = self.domains.lock().unwrap();
        let domain = domains.get_mut(&domain_id).ok_or(AppError::NotFound)?;
        domain.last_checked_at = Some(checked_at);
        Ok(())
    }

    async fn delete(&self, domain_id: Uuid) -> AppResult<()> {
        self.domains
            .lock()
            .unwrap()
            .remove(&domain_id)
            .ok_or(AppError::NotFound)?;
        Ok(())
    }

    async fn assign_group(&self, domain_ids: &[Uuid], group_id: Option<Uuid>) -> AppResult<u64> {
        let mut domains = self.domains.lock().unwrap();
        let mut affected = 0;
        for id in domain_ids {
            if let Some(domain) = domains.get_mut(id) {
                domain.notification_group_id = group_id;
                domain.updated_at = Some(Utc::now().naive_utc());
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn due_for_check(
        &self,
        cutoff: NaiveDateTime,
        limit: i64,
    ) -> AppResult<Vec<DomainProfile>> {
        let domains = self.domains.lock().unwrap();
        let mut due: Vec<DomainProfile> = domains
            .values()
            .filter(|d| d.last_checked_at.is_none_or(|at| at < cutoff))
            .cloned()
            .collect();
        due.sort_by_key(|d| d.last_checked_at);
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn stats_by_user(&self, user_id: Uuid) -> AppResult<PortfolioStats> {
        let domains = self.domains.lock().unwrap();
        let mut stats = PortfolioStats::default();
        for d in domains.values().filter(|d| d.user_id == user_id) {
            stats.total += 1;
            match d.status {
                DomainStatus::Active => stats.active += 1,
                DomainStatus::Expiring => stats.expiring += 1,
                DomainStatus::Expired => stats.expired += 1,
                DomainStatus::Unknown => stats.unknown += 1,
            }
        }
        Ok(stats)
    }
}
