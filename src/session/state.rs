//! Session state machine (§4.4). No terminal state: every variant has a path back to
//! `Online` once the charger reconnects and re-registers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No live transport. Entered on first contact, on watchdog expiry, and on transport close.
    Disconnected,
    /// Transport is up but BootNotification has not yet been Accepted.
    Booting,
    /// BootNotification accepted; heartbeat watchdog armed.
    Online,
    /// A connector reported `Faulted`; the charge point itself may still be reachable.
    Faulted,
    /// Operator set the charge point `Disabled`/`Maintenance` via ChangeAvailability.
    Unavailable,
}

impl SessionState {
    /// Whether CSMS-initiated calls may be dispatched to this charger right now.
    pub fn accepts_calls(self) -> bool {
        matches!(self, Self::Online | Self::Faulted)
    }
}
