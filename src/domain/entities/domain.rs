#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainStatus {
    Unknown,
    Active,
    Expiring,
    Expired,
}

impl DomainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainStatus::Unknown => "unknown",
            DomainStatus::Active => "active",
            DomainStatus::Expiring => "expiring",
            DomainStatus::Expired => "expired",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "active" => DomainStatus::Active,
            "expiring" => DomainStatus::Expiring,
            "expired" => DomainStatus::Expired,
            _ => DomainStatus::Unknown,
        }
    }
}

/// Derive the portfolio status of a domain from its expiry date.
///
/// A domain with no known expiry is `Unknown`; one expiring within
/// `threshold_days` is `Expiring`; one past its expiry is `Expired`.
pub fn derive_status(
    expires_at: Option<chrono::NaiveDateTime>,
    threshold_days: i64,
    now: chrono::NaiveDateTime,
) -> DomainStatus {
    match expires_at {
        None => DomainStatus::Unknown,
        Some(expiry) => {
            if expiry <= now {
                DomainStatus::Expired
            } else if (expiry - now).num_days() < threshold_days {
                DomainStatus::Expiring
            } else {
                DomainStatus::Active
            }
        }
    }
}
