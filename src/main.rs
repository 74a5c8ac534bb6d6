use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use tracing::info;

use domwatch::infra::{
    app::create_app,
    delivery_worker::run_delivery_loop,
    expiry_monitor::run_expiry_monitor_loop,
    setup::init_app_state,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let inited = init_app_state().await?;
    let app_state = inited.state;

    let bind_addr = app_state.config.bind_addr;

    let app = create_app(app_state.clone());

    // Background loops live for the whole server lifetime.
    let domain_uc = app_state.domain_use_cases.clone();
    let notification_uc = app_state.notification_use_cases.clone();
    let poll_secs = app_state.config.expiry_poll_secs;
    let refresh_hours = app_state.config.domain_refresh_hours;
    tokio::spawn(async move {
        run_expiry_monitor_loop(domain_uc, notification_uc, poll_secs, refresh_hours).await;
    });

    let notification_uc = app_state.notification_use_cases.clone();
    let email = Arc::clone(&inited.email);
    tokio::spawn(async move {
        run_delivery_loop(notification_uc, email).await;
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Backend listening at {}", &listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
