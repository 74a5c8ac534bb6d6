use crate::adapters::persistence::PostgresPersistence;

pub mod app;
pub mod config;
pub mod crypto;
pub mod db;
pub mod delivery_worker;
pub mod env_file;
pub mod expiry_monitor;
pub mod migrations;
pub mod rate_limit;
pub mod setup;
pub mod signer;

pub async fn postgres_persistence(database_url: &str) -> anyhow::Result<PostgresPersistence> {
    let pool = db::init_db(database_url).await?;
    Ok(PostgresPersistence::new(pool))
}
