use std::fs::File;
use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{
        dns::HickoryNsLookup,
        email::resend::ResendEmailSender,
        http::app_state::AppState,
        registry::{HttpRegistryClient, iana::IanaDirectoryClient},
    },
    application::use_cases::{
        auth::{AuthUseCases, EmailSender, MagicLinkRepo},
        domain::{DomainRepo, DomainUseCases, NsLookup, RegistryClient},
        notification::{DeliveryRepo, NotificationGroupRepo, NotificationRepo, NotificationUseCases},
        settings::{SettingsRepo, SettingsUseCases},
        tld::{TldDirectoryClient, TldRepo, TldUseCases},
        user::{UserRepo, UserUseCases},
    },
    infra::{
        config::AppConfig, crypto::AppCipher, postgres_persistence,
        rate_limit::RedisRateLimiter,
    },
};

/// Everything the server binary needs: the HTTP state plus the email sender
/// shared with the delivery worker.
pub struct InitializedApp {
    pub state: AppState,
    pub email: Arc<dyn EmailSender>,
}

pub async fn init_app_state() -> anyhow::Result<InitializedApp> {
    let config = AppConfig::from_env();

    let cipher = AppCipher::new_from_base64(config.encryption_key.expose_secret())
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let persistence = Arc::new(postgres_persistence(&config.database_url).await?);

    let rate_limiter = Arc::new(
        RedisRateLimiter::new(
            &config.redis_url,
            config.rate_limit_window_secs,
            config.rate_limit_per_ip,
            config.rate_limit_per_email,
        )
        .await?,
    );

    let email: Arc<dyn EmailSender> = Arc::new(ResendEmailSender::new(
        config.resend_api_key.clone(),
        config.email_from.clone(),
    ));

    let http_client = reqwest::Client::new();
    let registry: Arc<dyn RegistryClient> =
        Arc::new(HttpRegistryClient::new(http_client.clone()));
    let directory: Arc<dyn TldDirectoryClient> = Arc::new(IanaDirectoryClient::new(http_client));
    let ns: Arc<dyn NsLookup> = match config.dns_server {
        Some(addr) => Arc::new(HickoryNsLookup::with_nameserver(addr)),
        None => Arc::new(HickoryNsLookup::new()),
    };

    let user_repo = persistence.clone() as Arc<dyn UserRepo>;
    let magic_link_repo = persistence.clone() as Arc<dyn MagicLinkRepo>;
    let domain_repo = persistence.clone() as Arc<dyn DomainRepo>;
    let group_repo = persistence.clone() as Arc<dyn NotificationGroupRepo>;
    let notification_repo = persistence.clone() as Arc<dyn NotificationRepo>;
    let delivery_repo = persistence.clone() as Arc<dyn DeliveryRepo>;
    let tld_repo = persistence.clone() as Arc<dyn TldRepo>;
    let settings_repo = persistence.clone() as Arc<dyn SettingsRepo>;

    let settings_use_cases = Arc::new(SettingsUseCases::new(settings_repo, cipher.clone()));

    let auth_use_cases = Arc::new(AuthUseCases::new(
        user_repo.clone(),
        magic_link_repo,
        email.clone(),
        config.app_origin.to_string(),
    ));

    let user_use_cases = Arc::new(UserUseCases::new(user_repo));

    let domain_use_cases = Arc::new(DomainUseCases::new(
        domain_repo,
        group_repo.clone(),
        tld_repo.clone(),
        registry,
        ns,
        settings_use_cases.clone(),
    ));

    let notification_use_cases = Arc::new(NotificationUseCases::new(
        group_repo,
        notification_repo,
        delivery_repo,
        cipher,
    ));

    let tld_use_cases = Arc::new(TldUseCases::new(tld_repo, directory, config.whois_delay_ms));

    let state = AppState {
        config: Arc::new(config),
        auth_use_cases,
        user_use_cases,
        domain_use_cases,
        notification_use_cases,
        tld_use_cases,
        settings_use_cases,
        rate_limiter,
    };

    Ok(InitializedApp { state, email })
}

pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "domwatch=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false) // don’t show target (module path)
        .with_level(true) // show log level
        .pretty(); // human-friendly, with colors

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
