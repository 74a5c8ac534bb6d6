use chrono::Utc;
use uuid::Uuid;

use crate::application::use_cases::domain::DomainProfile;
use crate::application::use_cases::user::UserProfile;
use crate::domain::entities::domain::DomainStatus;
use crate::domain::entities::user::UserRole;

/// A member user with sensible defaults; customize via the closure.
pub fn create_test_user(customize: impl FnOnce(&mut UserProfile)) -> UserProfile {
    let now = Utc::now().naive_utc();
    let id = Uuid::new_v4();
    let mut user = UserProfile {
        id,
        email: format!("user-{id}@example.com"),
        name: "Test User".to_string(),
        role: UserRole::Member,
        timezone: "UTC".to_string(),
        last_login_at: None,
        created_at: Some(now),
        updated_at: Some(now),
    };
    customize(&mut user);
    user
}

/// An unchecked domain owned by `user_id`; customize via the closure.
pub fn create_test_domain(
    user_id: Uuid,
    customize: impl FnOnce(&mut DomainProfile),
) -> DomainProfile {
    let now = Utc::now().naive_utc();
    let mut domain = DomainProfile {
        id: Uuid::new_v4(),
        user_id,
        name: "example.com".to_string(),
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
    customize(&mut domain);
    domain
}
