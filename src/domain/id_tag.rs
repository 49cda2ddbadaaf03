//! IdTag — authorization record presented by a user (RFID, app token, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdTagStatus {
    Accepted,
    Blocked,
    Expired,
    Invalid,
    ConcurrentTx,
}

impl std::fmt::Display for IdTagStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTag {
    pub tag: String,
    pub status: IdTagStatus,
    pub parent_id: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl IdTag {
    /// Whether this tag is currently usable for authorization.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        if self.status != IdTagStatus::Accepted {
            return false;
        }
        match self.expiry {
            Some(exp) => exp > now,
            None => true,
        }
    }
}
