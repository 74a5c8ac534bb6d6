//! In-memory mocks, factories, and an app-state builder for tests.

pub mod app_state_builder;
pub mod domain_mocks;
pub mod factories;
pub mod notification_mocks;
pub mod stubs;
pub mod tld_mocks;
pub mod user_mocks;

pub use app_state_builder::{TestAppStateBuilder, test_tld_entry};
pub use domain_mocks::InMemoryDomainRepo;
pub use factories::{create_test_domain, create_test_user};
pub use notification_mocks::InMemoryNotificationRepo;
pub use stubs::{
    InMemoryEmailSender, InMemoryRateLimiter, InMemorySettingsRepo, StubEmailSender,
    StubNsLookup, StubRegistryClient, StubTldDirectory,
};
pub use tld_mocks::InMemoryTldRepo;
pub use user_mocks::InMemoryUserRepo;

use crate::infra::crypto::AppCipher;

/// Fixed 32-byte key (base64) so encrypted fixtures are reproducible.
pub const TEST_CIPHER_KEY_B64: &str = "QkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkI=";

pub fn test_cipher() -> AppCipher {
    AppCipher::new_from_base64(TEST_CIPHER_KEY_B64).expect("test cipher key should be valid")
}

/// Access token accepted by `TestAppStateBuilder`-built states.
pub fn access_token_for(user_id: uuid::Uuid) -> String {
    let secret = secrecy::SecretString::new("test_jwt_secret".into());
    crate::application::jwt::issue(user_id, &secret, time::Duration::hours(1))
        .expect("test token should issue")
}
