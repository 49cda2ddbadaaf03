//! Core business entities (§3 of the system design).
//!
//! These are plain, version-agnostic value types shared by the session state
//! machine, the store and the control API. Persistence-specific shapes (sea-orm
//! models) live under `crate::store::entities` and convert to/from these.

pub mod charge_point;
pub mod charging_session;
pub mod device;
pub mod device_event;
pub mod evse;
pub mod id_tag;
pub mod meter_value;
pub mod order;

pub use charge_point::{ChargePoint, Location, OperationalStatus, PhysicalStatus};
pub use charging_session::{ChargingSession, SessionStatus};
pub use device::Device;
pub use device_event::{DeviceEvent, EventKind};
pub use evse::{ConnectorType, Evse};
pub use id_tag::{IdTag, IdTagStatus};
pub use meter_value::MeterValue;
pub use order::Order;
