//! Stub and in-memory implementations for adapter-facing traits.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::auth::EmailSender,
    application::use_cases::domain::{NsLookup, RegistryClient, RegistryInfo},
    application::use_cases::settings::{SettingEntry, SettingsRepo},
    application::use_cases::tld::TldDirectoryClient,
    infra::rate_limit::RateLimiterTrait,
};

/// Email sender that drops everything.
#[derive(Default)]
pub struct StubEmailSender;

#[async_trait]
impl EmailSender for StubEmailSender {
    async fn send(&self, _to: &str, _subject: &str, _html: &str) -> AppResult<()> {
        Ok(())
    }
}

/// Email sender that records what it was asked to send.
#[derive(Default)]
pub struct InMemoryEmailSender {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl InMemoryEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for InMemoryEmailSender {
    async fn send(&self, to: &str, subject: &str, html: &str) -> AppResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), html.to_string()));
        Ok(())
    }
}

/// Registry client returning a canned response (or a canned failure).
#[derive(Default)]
pub struct StubRegistryClient {
    info: Option<RegistryInfo>,
    fail: bool,
}

impl StubRegistryClient {
    pub fn with_info(info: RegistryInfo) -> Self {
        Self {
            info: Some(info),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            info: None,
            fail: true,
        }
    }
}

#[async_trait]
impl RegistryClient for StubRegistryClient {
    async fn lookup(
        &self,
        _domain: &str,
        _rdap_url: Option<&str>,
        _whois_server: Option<&str>,
    ) -> AppResult<RegistryInfo> {
        if self.fail {
            return Err(AppError::Internal("stubbed registry failure".into()));
        }
        Ok(self.info.clone().unwrap_or_default())
    }
}

/// NS lookup returning a fixed record set (empty by default).
#[derive(Default)]
pub struct StubNsLookup {
    pub nameservers: Vec<String>,
}

#[async_trait]
impl NsLookup for StubNsLookup {
    async fn lookup_ns(&self, _domain: &str) -> AppResult<Vec<String>> {
        Ok(self.nameservers.clone())
    }
}

/// Scriptable TLD directory for import tests.
#[derive(Default)]
pub struct StubTldDirectory {
    pub tlds: Vec<String>,
    pub rdap: HashMap<String, String>,
    pub whois: HashMap<String, String>,
    pub fail_list: bool,
    pub fail_whois: bool,
    pub fail_whois_for: Option<String>,
}

#[async_trait]
impl TldDirectoryClient for StubTldDirectory {
    async fn fetch_tld_list(&self) -> AppResult<Vec<String>> {
        if self.fail_list {
            return Err(AppError::Internal("stubbed TLD list failure".into()));
        }
        Ok(self.tlds.clone())
    }

    async fn fetch_rdap_bootstrap(&self) -> AppResult<HashMap<String, String>> {
        Ok(self.rdap.clone())
    }

    async fn whois_referral(&self, tld: &str) -> AppResult<Option<String>> {
        if self.fail_whois || self.fail_whois_for.as_deref() == Some(tld) {
            return Err(AppError::Internal("stubbed WHOIS referral failure".into()));
        }
        Ok(self.whois.get(tld).cloned())
    }
}

/// In-memory settings store.
#[derive(Default)]
pub struct InMemorySettingsRepo {
    entries: Mutex<HashMap<String, SettingEntry>>,
}

impl InMemorySettingsRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsRepo for InMemorySettingsRepo {
    async fn get(&self, key: &str) -> AppResult<Option<SettingEntry>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn get_all(&self) -> AppResult<Vec<SettingEntry>> {
        let mut entries: Vec<SettingEntry> =
            self.entries.lock().unwrap().values().cloned().collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn upsert(&self, key: &str, value: &str, is_secret: bool) -> AppResult<()> {
        self.entries.lock().unwrap().insert(
            key.to_string(),
            SettingEntry {
                key: key.to_string(),
                value: value.to_string(),
                is_secret,
                updated_at: Some(Utc::now().naive_utc()),
            },
        );
        Ok(())
    }
}

/// Rate limiter that always allows the request.
#[derive(Default)]
pub struct InMemoryRateLimiter;

impl InMemoryRateLimiter {
    pub fn permissive() -> Self {
        Self
    }
}

#[async_trait]
impl RateLimiterTrait for InMemoryRateLimiter {
    async fn check(&self, _ip: &str, _email: Option<&str>) -> AppResult<()> {
        Ok(())
    }
}
