use config::Config;
use db::open_store;
use handlers::{router, AppState};
use tokio::net::TcpListener;

mod auth;
mod config;
mod db;
mod dto;
mod error;
mod handlers;
mod lifecycle;
mod memory;
mod models;

extern crate pretty_env_logger;
#[macro_use] extern crate log;

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let config = Config::from_env()?;
    let store = open_store(&config).await?;
    let state = AppState::new(store, config.photo_base_url.clone());

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("listening on {} with {} data", config.bind_addr, state.store.kind());
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
