//! # csapp Drivers
//!
//! The peripheral driver singletons: [`GpioDriver`], [`TimerDriver`] and
//! [`LoggingDriver`]. Each implements [`Driver`](crate::kernel::Driver):
//! construction only records configuration, and every operation fails with
//! [`DriverError::NotInitialized`] until `initialize` has negotiated the
//! device with the local server.
pub mod error;
pub mod gpio;
pub mod logging;
pub mod timer;

pub use error::DriverError;
pub use gpio::GpioDriver;
pub use logging::LoggingDriver;
pub use timer::{TimerDriver, TimerKind};

use crate::ipc::{Device, IpcError, Reply};

/// Check the server's answer to `DeviceInit` and return the advertised capacity.
pub(crate) fn expect_ready(device: Device, reply: Reply) -> Result<u32, DriverError> {
    match reply {
        Reply::DeviceReady { device: ready, capacity } if ready == device => Ok(capacity),
        reply => Err(DriverError::Ipc(IpcError::UnexpectedReply {
            request: "device.init",
            reply,
        })),
    }
}

// Test module declaration
#[cfg(test)]
mod tests;
