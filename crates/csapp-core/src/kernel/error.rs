//! # csapp Kernel Errors
//!
//! Defines the error types of the bootstrap kernel.
//!
//! [`Error`] is the primary enum. Subsystem errors ([`IpcError`],
//! [`DriverError`], [`ConfigError`]) convert into it with `?`, and
//! [`Error::KernelLifecycleError`] records which bootstrap phase failed.
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::config::ConfigError;
use crate::drivers::DriverError;
use crate::ipc::IpcError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Specific, typed IPC error
    #[error("IPC error: {0}")]
    Ipc(#[from] IpcError),

    /// Specific, typed driver error
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error occurring during a specific bootstrap phase.
    #[error("Kernel lifecycle error during {phase}: {message}")]
    KernelLifecycleError {
        phase: KernelLifecyclePhase,
        component_name: Option<String>,
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// Error related to DriverRegistry operations or driver lookup failures.
    #[error("Driver registry error during operation '{operation}': {message}")]
    ComponentRegistryError {
        operation: String, // e.g., "RegisterDriver", "AssembleSystem"
        component_name: Option<String>,
        message: String,
    },

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Represents a specific phase of the bootstrap sequence.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum KernelLifecyclePhase {
    #[error("AcquireChannel")]
    AcquireChannel,
    #[error("ConstructDrivers")]
    ConstructDrivers,
    #[error("InitDrivers")]
    InitDrivers,
    #[error("AppSetup")]
    AppSetup,
    #[error("AppLoop")]
    AppLoop,
    #[error("Transition")]
    Transition,
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl Error {
    /// Wrap `source` as the cause of a failed bootstrap phase.
    pub fn lifecycle(
        phase: KernelLifecyclePhase,
        component_name: Option<&str>,
        message: impl Into<String>,
        source: impl Into<Error>,
    ) -> Self {
        Error::KernelLifecycleError {
            phase,
            component_name: component_name.map(str::to_string),
            message: message.into(),
            source: Some(Box::new(source.into())),
        }
    }

    /// The bootstrap phase this error was raised in, if it is a lifecycle error
    pub fn phase(&self) -> Option<&KernelLifecyclePhase> {
        match self {
            Error::KernelLifecycleError { phase, .. } => Some(phase),
            _ => None,
        }
    }

    /// Walk lifecycle wrappers down to the innermost kernel error.
    pub fn root(&self) -> &Error {
        match self {
            Error::KernelLifecycleError { source: Some(inner), .. } => inner.root(),
            other => other,
        }
    }
}
