use strum::{AsRefStr, EnumString};

/// Destination type of a notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ChannelKind {
    Email,
    Webhook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}
