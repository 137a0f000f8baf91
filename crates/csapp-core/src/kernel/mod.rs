//! # csapp Kernel
//!
//! The bootstrap coordinator and what it is built from.
//!
//! - [`Bootstrap`](bootstrap::Bootstrap) runs the one-time startup pass:
//!   open the channel to the local server, construct the driver singletons in
//!   [`DRIVER_ORDER`](bootstrap::DRIVER_ORDER), initialize them, run the
//!   application's `setup`, then hand over to its loop. [`startup`] wraps it
//!   as the process entry point.
//! - [`Driver`](component::Driver) and [`DriverRegistry`](component::DriverRegistry)
//!   hold the constructed drivers by concrete type.
//! - [`System`](system::System) is what the application receives.
//! - [`Error`](error::Error) aggregates the subsystem errors and records the
//!   failing phase.
pub mod bootstrap;
pub mod component;
pub mod constants;
pub mod error;
pub mod system;

pub use bootstrap::{startup, BootPhase, Bootstrap, DRIVER_ORDER};
pub use component::{Driver, DriverContext, DriverRegistry};
pub use error::{Error, KernelLifecyclePhase, Result};
pub use system::System;

// Test module declaration
#[cfg(test)]
mod tests;
