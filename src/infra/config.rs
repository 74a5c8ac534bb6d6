use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use time::Duration;
use url::Url;

pub struct AppConfig {
    pub jwt_secret: SecretString,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub app_origin: Url,
    pub cors_origin: HeaderValue,
    pub magic_link_ttl_minutes: i64,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub redis_url: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_per_ip: u64,
    pub rate_limit_per_email: u64,
    /// Whether to trust X-Forwarded-For headers. Set to true when behind a reverse proxy.
    /// SECURITY: Only enable this when the API is not directly exposed to the internet.
    pub trust_proxy: bool,
    /// Base64-encoded 32-byte key for settings secrets and channel signing keys.
    pub encryption_key: SecretString,
    pub resend_api_key: SecretString,
    pub email_from: String,
    /// How often the expiry monitor wakes up.
    pub expiry_poll_secs: u64,
    /// A domain is re-checked against its registry after this many hours.
    pub domain_refresh_hours: i64,
    /// Pause between consecutive IANA WHOIS referral queries during imports.
    pub whois_delay_ms: u64,
    /// Optional DNS server for NS lookups (e.g. a local resolver in dev).
    pub dns_server: Option<SocketAddr>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());

        let refresh_token_ttl_days: i64 = get_env_default("REFRESH_TOKEN_TTL_DAYS", 30);
        let access_token_ttl_secs: i64 = get_env_default("ACCESS_TOKEN_TTL_SECS", 86_400);

        let app_origin: Url = get_env("APP_ORIGIN");
        let magic_link_ttl_minutes: i64 = get_env_default("MAGIC_LINK_TTL_MINUTES", 15);
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let database_url: String = get_env("DATABASE_URL");
        let redis_url: String = get_env_default("REDIS_URL", "redis://127.0.0.1:6379".to_string());
        let rate_limit_window_secs: u64 = get_env_default("RATE_LIMIT_WINDOW_SECS", 60);
        let rate_limit_per_ip: u64 = get_env_default("RATE_LIMIT_PER_IP", 60);
        let rate_limit_per_email: u64 = get_env_default("RATE_LIMIT_PER_EMAIL", 30);
        // Default to false for security - must explicitly enable when behind a trusted proxy
        let trust_proxy: bool = get_env_default("TRUST_PROXY", false);

        let encryption_key: SecretString =
            SecretString::new(get_env::<String>("APP_ENCRYPTION_KEY").into());
        let resend_api_key: SecretString =
            SecretString::new(get_env::<String>("RESEND_API_KEY").into());
        let email_from: String = get_env_default("EMAIL_FROM", "alerts@domwatch.dev".to_string());

        let expiry_poll_secs: u64 = get_env_default("EXPIRY_POLL_SECS", 3_600);
        let domain_refresh_hours: i64 = get_env_default("DOMAIN_REFRESH_HOURS", 24);
        let whois_delay_ms: u64 = get_env_default("WHOIS_DELAY_MS", 500);
        let dns_server: Option<SocketAddr> = std::env::var("DNS_SERVER")
            .ok()
            .and_then(|s| s.parse().ok());

        Self {
            jwt_secret,
            access_token_ttl: Duration::seconds(access_token_ttl_secs),
            refresh_token_ttl: Duration::days(refresh_token_ttl_days),
            app_origin,
            cors_origin,
            magic_link_ttl_minutes,
            bind_addr,
            database_url,
            redis_url,
            rate_limit_window_secs,
            rate_limit_per_ip,
            rate_limit_per_email,
            trust_proxy,
            encryption_key,
            resend_api_key,
            email_from,
            expiry_poll_secs,
            domain_refresh_hours,
            whois_delay_ms,
            dns_server,
        }
    }
}
