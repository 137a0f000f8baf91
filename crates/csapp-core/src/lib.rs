//! # csapp-core
//!
//! Application bootstrap for a microkernel userland: open the channel to the
//! local system server, bring up the GPIO, Timer and Logging drivers in a
//! fixed order, then hand control to the application.
//!
//! ```no_run
//! use async_trait::async_trait;
//! use csapp_core::{App, BootConfig, LocalConnector, LocalServer, System, PRIMARY_LOCAL_SERVICE};
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl App for Hello {
//!     async fn setup(&mut self, system: &System) -> csapp_core::Result<()> {
//!         system.logging().info("hello").await?;
//!         Ok(())
//!     }
//! }
//!
//! let config = BootConfig::default();
//! let connector = LocalConnector::new().with_service(PRIMARY_LOCAL_SERVICE, LocalServer::from_config(&config));
//! csapp_core::startup(config, connector, Hello);
//! ```
pub mod config;
pub mod drivers;
pub mod event;
pub mod ipc;
pub mod kernel;
pub mod runtime;

pub use config::{BootConfig, ConfigError, ConfigFormat};
pub use drivers::{DriverError, GpioDriver, LoggingDriver, TimerDriver};
pub use event::{DeviceEvent, Event, EventManager, SystemEvent};
pub use ipc::{Connector, IpcError, LocalConnector, LocalServer, PRIMARY_LOCAL_SERVICE};
pub use kernel::error::Error as KernelError;
pub use kernel::{startup, BootPhase, Bootstrap, Result, System};
pub use runtime::{App, LoopControl, Termination};
