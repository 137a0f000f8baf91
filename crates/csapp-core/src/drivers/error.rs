//! # csapp Driver Errors
//!
//! Defines [`DriverError`], raised by driver operations either locally
//! (argument checks, lifecycle misuse) or when the server rejects a request.
use thiserror::Error;

use crate::ipc::{IpcError, PinId, PinMode, TimerId};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Driver '{driver}' has not been initialized")]
    NotInitialized { driver: &'static str },

    #[error("Driver '{driver}' is already initialized")]
    AlreadyInitialized { driver: &'static str },

    #[error("Pin {pin} is out of range (pin count {pin_count})")]
    InvalidPin { pin: PinId, pin_count: u8 },

    #[error("Pin {pin} is configured as {actual:?}, operation requires {required}")]
    WrongMode {
        pin: PinId,
        required: PinMode,
        actual: Option<PinMode>,
    },

    #[error("Pin {pin} has not been configured")]
    Unconfigured { pin: PinId },

    #[error("Timer interval must be greater than zero")]
    InvalidInterval,

    #[error("No more than {max} timers may be armed at once")]
    CapacityExceeded { max: usize },

    #[error("{timer} is not armed")]
    UnknownTimer { timer: TimerId },

    #[error("IPC failure: {0}")]
    Ipc(#[from] IpcError),
}
