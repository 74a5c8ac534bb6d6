pub mod auth;
pub mod domain;
pub mod notification;
pub mod settings;
pub mod tld;
pub mod user;
