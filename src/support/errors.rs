//! Error taxonomy shared by the codec, router, session and store layers.
//!
//! These are the abstract kinds the core distinguishes between; each variant
//! maps to a specific wire behavior (CALLERROR code, connection close, control
//! API rejection) at the point where it surfaces.

use thiserror::Error;

/// Errors surfaced while decoding or validating an inbound OCPP-J frame.
#[derive(Debug, Error, Clone)]
pub enum CodecError {
    #[error("malformed frame: {0}")]
    Decode(String),

    #[error("{code}: {description}")]
    Validation { code: &'static str, description: String },
}

impl CodecError {
    /// The OCPP CALLERROR code this error should be reported as.
    pub fn call_error_code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "FormationViolation",
            Self::Validation { code, .. } => code,
        }
    }

    pub fn description(&self) -> String {
        match self {
            Self::Decode(msg) => msg.clone(),
            Self::Validation { description, .. } => description.clone(),
        }
    }
}

/// Top-level error type returned by the session state machine and the store.
#[derive(Debug, Error)]
pub enum CsmsError {
    #[error("malformed frame: {0}")]
    Decode(String),

    #[error(transparent)]
    Validation(#[from] CodecError),

    #[error("unknown charger: {0}")]
    UnknownCharger(String),

    #[error("illegal in current state: {0}")]
    State(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("timeout waiting for response")]
    Timeout,

    #[error("charger {0} is not online")]
    ChargerOffline(String),

    #[error("outbound queue full for charger {0}")]
    ChargerBusy(String),

    #[error("charger {0} disconnected while call was pending")]
    ChargerDisconnected(String),
}

impl From<sea_orm::DbErr> for CsmsError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::Store(e.to_string())
    }
}

impl CsmsError {
    /// The OCPP CALLERROR code this error should be reported as when it surfaces as the
    /// response to an inbound charge-point CALL.
    pub fn call_error_code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "FormationViolation",
            Self::Validation(e) => e.call_error_code(),
            Self::UnknownCharger(_) => "GenericError",
            Self::State(_) | Self::Store(_) | Self::Transport(_) | Self::Timeout => "InternalError",
            Self::ChargerOffline(_) | Self::ChargerBusy(_) | Self::ChargerDisconnected(_) => "InternalError",
        }
    }
}

pub type CsmsResult<T> = Result<T, CsmsError>;
