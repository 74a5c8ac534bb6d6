use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::{instrument, warn};

use crate::app_error::{AppError, AppResult};
use crate::infra::crypto::AppCipher;

pub const DEFAULT_ALERT_DAYS: i64 = 30;

/// Editable application settings. Secret values are AES-encrypted at rest
/// and never echoed back through the API.
const KNOWN_KEYS: &[(&str, bool)] = &[
    ("app_name", false),
    ("alert_days_before_expiry", false),
    ("resend_api_key", true),
];

#[derive(Debug, Clone)]
pub struct SettingEntry {
    pub key: String,
    pub value: String,
    pub is_secret: bool,
    pub updated_at: Option<NaiveDateTime>,
}

#[async_trait]
pub trait SettingsRepo: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<SettingEntry>>;
    async fn get_all(&self) -> AppResult<Vec<SettingEntry>>;
    async fn upsert(&self, key: &str, value: &str, is_secret: bool) -> AppResult<()>;
}

/// A setting as presented over the API: secret values are masked.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SettingView {
    pub key: String,
    pub value: Option<String>,
    pub is_secret: bool,
}

#[derive(Clone)]
pub struct SettingsUseCases {
    repo: Arc<dyn SettingsRepo>,
    cipher: AppCipher,
}

impl SettingsUseCases {
    pub fn new(repo: Arc<dyn SettingsRepo>, cipher: AppCipher) -> Self {
        Self { repo, cipher }
    }

    /// Seed defaults for keys that have no row yet. Called by the installer.
    #[instrument(skip(self))]
    pub async fn seed_defaults(&self) -> AppResult<()> {
        let defaults = [
            ("app_name", "domwatch"),
            ("alert_days_before_expiry", "30"),
        ];
        for (key, value) in defaults {
            if self.repo.get(key).await?.is_none() {
                self.repo.upsert(key, value, false).await?;
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> AppResult<Vec<SettingView>> {
        let entries = self.repo.get_all().await?;
        Ok(entries
            .into_iter()
            .map(|e| SettingView {
                value: if e.is_secret { None } else { Some(e.value) },
                key: e.key,
                is_secret: e.is_secret,
            })
            .collect())
    }

    /// Apply a partial update. Unknown keys and invalid values are rejected
    /// before anything is written.
    #[instrument(skip(self, changes))]
    pub async fn update(&self, changes: &HashMap<String, String>) -> AppResult<()> {
        for (key, value) in changes {
            let secret = is_secret_key(key).ok_or_else(|| {
                AppError::InvalidInput(format!("Unknown setting '{key}'"))
            })?;
            validate_value(key, value)?;

            let stored = if secret {
                self.cipher.encrypt(value)?
            } else {
                value.trim().to_string()
            };
            self.repo.upsert(key, &stored, secret).await?;
        }
        Ok(())
    }

    /// Days before expiry at which a domain counts as expiring. Read live so
    /// an edit takes effect on the next monitor pass.
    pub async fn alert_threshold_days(&self) -> i64 {
        match self.repo.get("alert_days_before_expiry").await {
            Ok(Some(entry)) => entry.value.parse().unwrap_or(DEFAULT_ALERT_DAYS),
            Ok(None) => DEFAULT_ALERT_DAYS,
            Err(e) => {
                warn!(error = ?e, "Failed to read alert threshold, using default");
                DEFAULT_ALERT_DAYS
            }
        }
    }

    /// Decrypted secret setting for internal consumers; None when unset.
    pub async fn secret_value(&self, key: &str) -> AppResult<Option<String>> {
        match self.repo.get(key).await? {
            Some(entry) if entry.is_secret => Ok(Some(self.cipher.decrypt(&entry.value)?)),
            Some(entry) => Ok(Some(entry.value)),
            None => Ok(None),
        }
    }
}

fn is_secret_key(key: &str) -> Option<bool> {
    KNOWN_KEYS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, secret)| *secret)
}

fn validate_value(key: &str, value: &str) -> AppResult<()> {
    match key {
        "alert_days_before_expiry" => {
            let days: i64 = value
                .trim()
                .parse()
                .map_err(|_| AppError::InvalidInput("Alert days must be a number".into()))?;
            if !(1..=365).contains(&days) {
                return Err(AppError::InvalidInput(
                    "Alert days must be between 1 and 365".into(),
                ));
            }
            Ok(())
        }
        "app_name" if value.trim().is_empty() => {
            Err(AppError::InvalidInput("App name must not be empty".into()))
        }
        _ => Ok(()),
    }
}
