use strum::{AsRefStr, EnumString};

/// Which sources a TLD registry import touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ImportMode {
    Full,
    RdapOnly,
    WhoisOnly,
    CheckUpdates,
}

impl ImportMode {
    pub fn wants_rdap(&self) -> bool {
        matches!(self, ImportMode::Full | ImportMode::RdapOnly | ImportMode::CheckUpdates)
    }

    pub fn wants_whois(&self) -> bool {
        matches!(self, ImportMode::Full | ImportMode::WhoisOnly | ImportMode::CheckUpdates)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ImportStatus {
    Running,
    Completed,
    Failed,
}
