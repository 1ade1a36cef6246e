//! # carhubd — carhub daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (`carhub.toml`, `CARHUB_*` environment variables)
//! - Install the `tracing` subscriber
//! - Open the `SQLite` database and restore the Settings store
//! - Open the serial devices and start the components that drive them
//! - Start the derived-signal tasks and the optional MQTT mirror
//! - Serve the HTTP API until Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod components;
mod config;

use std::sync::Arc;

use carhub_adapter_http_axum::AppState;
use carhub_adapter_mqtt::MqttBridge;
use carhub_adapter_serial::{SerialHub, TtyOpener};
use carhub_adapter_storage_sqlite_sqlx::SqliteSettingsRepository;
use carhub_app::derived::{AnyOf, VoltageMonitor};
use carhub_app::event_store::{EventStore, SessionStore};
use carhub_app::ports::Persistence;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Settings, durable
    let db = carhub_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let settings = Arc::new(EventStore::settings(SqliteSettingsRepository::new(
        db.pool().clone(),
    )));
    settings.load(config.seed_settings());
    restore_settings(&settings).await;

    // Session, ephemeral
    let session = Arc::new(SessionStore::session());

    // Serial devices
    let serial = Arc::new(SerialHub::from_config(&config.serial));
    let _serial_tasks = if config.serial.enabled {
        serial.start(TtyOpener, &session)
    } else {
        tracing::info!("serial devices disabled");
        Vec::new()
    };

    // Automation
    let _component_tasks = components::start(&settings, &session, &serial)?;
    let _derived_tasks = [
        AnyOf::doors().start(Arc::clone(&session)),
        AnyOf::windows().start(Arc::clone(&session)),
        VoltageMonitor.start(Arc::clone(&session)),
    ];

    // MQTT mirror
    let _mqtt_tasks = if config.mqtt.enabled {
        let (publisher, connection) = carhub_adapter_mqtt::connect(&config.mqtt);
        let bridge = MqttBridge::new(publisher, &config.mqtt).start(&settings, &session);
        tracing::info!(broker = %config.mqtt.broker_host, "mirroring stores to MQTT");
        vec![connection, bridge]
    } else {
        Vec::new()
    };

    // Replay stored settings to every subscriber registered above.
    settings.flush();

    // HTTP
    let app = carhub_adapter_http_axum::build(AppState::new(
        Arc::clone(&settings),
        Arc::clone(&session),
        Arc::clone(&serial),
    ));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "carhubd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    tracing::info!("carhubd stopped");
    Ok(())
}

/// Overlay persisted settings on the seeded ones; a storage failure keeps
/// the seeds.
async fn restore_settings<P: Persistence>(settings: &EventStore<P>) {
    match settings.restore().await {
        Ok(restored) => tracing::info!(restored, "settings restored"),
        Err(err) => {
            tracing::warn!(error = %err, "failed to restore settings, continuing with configured defaults");
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
