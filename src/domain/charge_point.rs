//! Charge point entity — one logical OCPP endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Physical state of a charge point or one of its connectors, per OCPP 1.6 Availability/Status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhysicalStatus {
    Available,
    Preparing,
    Charging,
    SuspendedEV,
    SuspendedEVSE,
    Finishing,
    Reserved,
    Unavailable,
    Faulted,
}

impl Default for PhysicalStatus {
    fn default() -> Self {
        Self::Unavailable
    }
}

impl std::fmt::Display for PhysicalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::str::FromStr for PhysicalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(Self::Available),
            "Preparing" => Ok(Self::Preparing),
            "Charging" => Ok(Self::Charging),
            "SuspendedEV" => Ok(Self::SuspendedEV),
            "SuspendedEVSE" => Ok(Self::SuspendedEVSE),
            "Finishing" => Ok(Self::Finishing),
            "Reserved" => Ok(Self::Reserved),
            "Unavailable" => Ok(Self::Unavailable),
            "Faulted" => Ok(Self::Faulted),
            other => Err(format!("unknown connector status: {other}")),
        }
    }
}

/// Operator-controlled availability, independent of what the hardware reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationalStatus {
    Enabled,
    Disabled,
    Maintenance,
}

impl Default for OperationalStatus {
    fn default() -> Self {
        Self::Enabled
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
}

impl Location {
    pub fn is_set(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// One logical OCPP endpoint — id is shared with the owning [`Device`](super::Device) serial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargePoint {
    pub id: String,
    pub vendor: String,
    pub model: String,
    pub firmware_version: Option<String>,
    pub physical_status: PhysicalStatus,
    pub operational_status: OperationalStatus,
    pub last_seen: Option<DateTime<Utc>>,
    pub location: Location,
    pub price_per_kwh: Option<f64>,
    pub nominal_rate_kw: Option<f64>,
}

impl ChargePoint {
    pub fn new(id: impl Into<String>, vendor: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            vendor: vendor.into(),
            model: model.into(),
            firmware_version: None,
            physical_status: PhysicalStatus::Unavailable,
            operational_status: OperationalStatus::Enabled,
            last_seen: None,
            location: Location::default(),
            price_per_kwh: None,
            nominal_rate_kw: None,
        }
    }

    /// `has_location ∧ has_pricing` — used by the onboarding flow.
    pub fn is_configured(&self) -> bool {
        self.location.is_set() && self.price_per_kwh.is_some()
    }

    /// `(physical=Available) ∧ (operational=ENABLED)`
    pub fn is_available(&self) -> bool {
        self.physical_status == PhysicalStatus::Available
            && self.operational_status == OperationalStatus::Enabled
    }
}
