pub mod domain;
pub mod notification;
pub mod tld;
pub mod user;
