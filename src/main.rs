//! OCPP 1.6J Central System Management System.
//!
//! Reads configuration from TOML (`$OCPP_CONFIG` or `~/.config/csms/config.toml`), runs
//! migrations, and starts the WebSocket and MQTT front ends plus the REST control plane
//! side by side, all sharing a single `Router`.

use std::sync::Arc;
use std::time::Duration;

use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use ocpp_csms::cache::Cache;
use ocpp_csms::config::{default_config_path, AppConfig};
use ocpp_csms::control_api::ControlApi;
use ocpp_csms::router::Router;
use ocpp_csms::store::migrator::Migrator;
use ocpp_csms::store::sea_orm_store::SeaOrmStore;
use ocpp_csms::store::Store;
use ocpp_csms::support::shutdown::ShutdownCoordinator;
use ocpp_csms::{api, transport};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var("OCPP_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());

    let app_cfg = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level)),
                )
                .init();
            info!(path = %config_path.display(), "configuration loaded");
            cfg
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .init();
            warn!(error = %e, "failed to load config, using defaults");
            AppConfig::default()
        }
    };

    info!("starting OCPP CSMS");

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus metrics recorder");
    let _ = prometheus_handle;

    let sea_store = SeaOrmStore::connect(&app_cfg.store.url).await?;
    info!(url = %app_cfg.store.url, "connected to store");

    info!("running migrations");
    Migrator::up(sea_store.connection(), None).await?;
    info!("migrations complete");

    let store: Arc<dyn Store> = Arc::new(sea_store);
    let cache = Arc::new(Cache::new(Duration::from_secs(app_cfg.session.authorize_cache_ttl_seconds)));

    let router = Router::new(store.clone(), cache.clone(), app_cfg.session.clone());
    router.rebuild_cache().await?;

    let watchdog_interval = Duration::from_secs(app_cfg.session.heartbeat_interval_seconds);
    let _watchdog = router.spawn_watchdog(watchdog_interval);

    let control = Arc::new(ControlApi::new(router.clone(), store.clone(), cache.clone()));

    let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout_seconds);
    shutdown.start_signal_listener();
    let shutdown_signal = shutdown.signal();

    let inbound_buffer_depth = app_cfg.session.inbound_buffer_depth;

    let ws_listener = tokio::net::TcpListener::bind(app_cfg.server.ws_listen_addr()).await?;
    info!(addr = %app_cfg.server.ws_listen_addr(), "WebSocket front end listening");
    let ws_router = router.clone();
    let ws_task = tokio::spawn(async move { transport::websocket::run(ws_listener, ws_router, inbound_buffer_depth).await });

    let offline_timeout = Duration::from_secs(app_cfg.mqtt.offline_timeout_seconds);
    let mqtt_router = router.clone();
    let mqtt_config = app_cfg.mqtt.clone();
    let mqtt_task = tokio::spawn(async move { transport::mqtt::run(mqtt_config, offline_timeout, inbound_buffer_depth, mqtt_router).await });

    let api_listener = tokio::net::TcpListener::bind(app_cfg.server.api_listen_addr()).await?;
    info!(addr = %app_cfg.server.api_listen_addr(), "REST control plane listening");
    let api_shutdown = shutdown_signal.clone();
    let api_server = axum::serve(api_listener, api::router(control))
        .with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("REST control plane received shutdown signal");
        });
    let api_task = tokio::spawn(async move { api_server.await });

    info!("all front ends started");

    tokio::select! {
        _ = ws_task => error!("WebSocket front end exited"),
        _ = mqtt_task => error!("MQTT front end exited"),
        result = api_task => {
            match result {
                Ok(Ok(())) => info!("REST control plane stopped"),
                Ok(Err(e)) => error!(error = %e, "REST control plane error"),
                Err(e) => error!(error = %e, "REST control plane task panicked"),
            }
        }
        _ = shutdown_signal.notified().wait() => info!("shutdown signal received"),
    }

    info!("OCPP CSMS shutdown complete");
    Ok(())
}
