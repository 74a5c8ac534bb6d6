//! Test app state builder for HTTP-level integration testing.
//!
//! Creates an `AppState` backed entirely by in-memory mocks, so route
//! handlers can be exercised through `axum_test::TestServer`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;
use url::Url;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        auth::{AuthUseCases, EmailSender},
        domain::{DomainProfile, DomainUseCases, NsLookup, RegistryClient},
        notification::NotificationUseCases,
        settings::SettingsUseCases,
        tld::{TldDirectoryClient, TldEntry, TldUseCases},
        user::{UserProfile, UserUseCases},
    },
    infra::{config::AppConfig, rate_limit::RateLimiterTrait},
    test_utils::{
        InMemoryDomainRepo, InMemoryEmailSender, InMemoryNotificationRepo, InMemoryRateLimiter,
        InMemorySettingsRepo, InMemoryTldRepo, InMemoryUserRepo, StubNsLookup,
        StubRegistryClient, StubTldDirectory, test_cipher,
    },
};

pub struct TestAppStateBuilder {
    users: Vec<UserProfile>,
    domains: Vec<DomainProfile>,
    tlds: Vec<TldEntry>,
    registry: StubRegistryClient,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            users: vec![],
            domains: vec![],
            tlds: vec![],
            registry: StubRegistryClient::default(),
        }
    }

    pub fn with_user(mut self, user: UserProfile) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_domain(mut self, domain: DomainProfile) -> Self {
        self.domains.push(domain);
        self
    }

    pub fn with_tld(mut self, entry: TldEntry) -> Self {
        self.tlds.push(entry);
        self
    }

    pub fn with_registry(mut self, registry: StubRegistryClient) -> Self {
        self.registry = registry;
        self
    }

    /// Build the AppState, also returning the email recorder for assertions.
    pub fn build_with_email(self) -> (AppState, Arc<InMemoryEmailSender>) {
        let cipher = test_cipher();

        let user_repo = Arc::new(InMemoryUserRepo::with_users(self.users));
        let domain_repo = Arc::new(InMemoryDomainRepo::with_domains(self.domains));
        let notification_repo = Arc::new(InMemoryNotificationRepo::new());
        let tld_repo = Arc::new(InMemoryTldRepo::new());
        for entry in self.tlds {
            tld_repo.seed_entry(entry);
        }
        let settings_repo = Arc::new(InMemorySettingsRepo::new());
        let email = Arc::new(InMemoryEmailSender::new());

        let settings_use_cases = Arc::new(SettingsUseCases::new(
            settings_repo,
            cipher.clone(),
        ));

        let auth_use_cases = Arc::new(AuthUseCases::new(
            user_repo.clone(),
            user_repo.clone(),
            email.clone() as Arc<dyn EmailSender>,
            "http://localhost:3000".to_string(),
        ));

        let user_use_cases = Arc::new(UserUseCases::new(user_repo));

        let directory: Arc<dyn TldDirectoryClient> = Arc::new(StubTldDirectory::default());
        let tld_use_cases = Arc::new(TldUseCases::new(tld_repo.clone(), directory, 0));

        let domain_use_cases = Arc::new(DomainUseCases::new(
            domain_repo,
            notification_repo.clone(),
            tld_repo,
            Arc::new(self.registry) as Arc<dyn RegistryClient>,
            Arc::new(StubNsLookup::default()) as Arc<dyn NsLookup>,
            settings_use_cases.clone(),
        ));

        let notification_use_cases = Arc::new(NotificationUseCases::new(
            notification_repo.clone(),
            notification_repo.clone(),
            notification_repo,
            cipher,
        ));

        let config = Arc::new(AppConfig {
            jwt_secret: SecretString::new("test_jwt_secret".into()),
            access_token_ttl: Duration::hours(24),
            refresh_token_ttl: Duration::days(30),
            app_origin: Url::parse("http://localhost:3000").unwrap(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            magic_link_ttl_minutes: 15,
            bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
            database_url: String::new(),
            redis_url: String::new(),
            rate_limit_window_secs: 60,
            rate_limit_per_ip: 60,
            rate_limit_per_email: 30,
            trust_proxy: false,
            encryption_key: SecretString::new(
                crate::test_utils::TEST_CIPHER_KEY_B64.into(),
            ),
            resend_api_key: SecretString::new("re_test".into()),
            email_from: "alerts@domwatch.test".to_string(),
            expiry_poll_secs: 3_600,
            domain_refresh_hours: 24,
            whois_delay_ms: 0,
            dns_server: None,
        });

        let rate_limiter: Arc<dyn RateLimiterTrait> =
            Arc::new(InMemoryRateLimiter::permissive());

        let state = AppState {
            config,
            auth_use_cases,
            user_use_cases,
            domain_use_cases,
            notification_use_cases,
            tld_use_cases,
            settings_use_cases,
            rate_limiter,
        };
        (state, email)
    }

    pub fn build(self) -> AppState {
        self.build_with_email().0
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience: a TLD registry entry for tests.
pub fn test_tld_entry(tld: &str, rdap_url: Option<&str>, whois_server: Option<&str>) -> TldEntry {
    let now = chrono::Utc::now().naive_utc();
    TldEntry {
        id: Uuid::new_v4(),
        tld: tld.to_string(),
        rdap_url: rdap_url.map(str::to_string),
        whois_server: whois_server.map(str::to_string),
        source: if rdap_url.is_some() { "rdap" } else { "whois" }.to_string(),
        last_checked_at: Some(now),
        created_at: Some(now),
        updated_at: Some(now),
    }
}
