//! # OCPP CSMS core
//!
//! Transport-agnostic OCPP 1.6J Central System: a unified WebSocket/MQTT front door, an
//! `OcppFrame` codec, a `Router` that correlates and dedups calls per charger, a `Session`
//! state machine per charge point, and a `Store`/`Cache`/`ControlApi` stack behind it.
//!
//! - **codec**: wire framing (`OcppFrame`) and the `Action` enum
//! - **transport**: WebSocket and MQTT front ends, both speaking `OutboundChannel`
//! - **router**: call-id correlation, inbound dedup, the outbound queue pump, the watchdog
//! - **session**: per-charger state machine (auth cache, outbound queue, in-flight call)
//! - **domain**: charge points, charging sessions, devices, events — storage-agnostic types
//! - **store**: persistence trait plus its sea-orm implementation
//! - **cache**: in-memory live status / pending-call / id-tag cache
//! - **control_api**: operator-facing facade over `Router`/`Store`/`Cache`
//! - **api**: REST control plane over `control_api`
//! - **config**: TOML-based application configuration
//! - **support**: errors, retry, shutdown coordination

pub mod api;
pub mod cache;
pub mod codec;
pub mod config;
pub mod control_api;
pub mod domain;
pub mod router;
pub mod session;
pub mod store;
pub mod support;
pub mod transport;

pub use config::{default_config_path, AppConfig};
pub use control_api::ControlApi;
pub use router::Router;
pub use store::sea_orm_store::SeaOrmStore;
pub use store::Store;
