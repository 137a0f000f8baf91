#[cfg(test)]
mod logging_tests;
#[cfg(test)]
mod timer_tests;

use std::sync::Arc;

use crate::config::BootConfig;
use crate::drivers::{GpioDriver, LoggingDriver, TimerDriver};
use crate::ipc::{Channel, LocalServer, PRIMARY_LOCAL_SERVICE};
use crate::kernel::component::{DriverContext, DriverRegistry};

/// A server, an open channel and freshly constructed drivers
pub(super) struct Rig {
    pub server: LocalServer,
    pub channel: Arc<Channel>,
    pub registry: DriverRegistry,
    pub config: BootConfig,
}

impl Rig {
    pub fn new(server: LocalServer, config: BootConfig) -> Self {
        let channel = Arc::new(server.accept(PRIMARY_LOCAL_SERVICE).expect("accept"));
        let mut registry = DriverRegistry::new();
        registry.register_instance(Arc::new(GpioDriver::new(&config.gpio))).unwrap();
        registry.register_instance(Arc::new(TimerDriver::new(&config.timer))).unwrap();
        registry.register_instance(Arc::new(LoggingDriver::new(&config.logging))).unwrap();
        Self { server, channel, registry, config }
    }

    pub fn context(&self) -> DriverContext<'_> {
        DriverContext {
            channel: &self.channel,
            config: &self.config,
            registry: &self.registry,
        }
    }

    pub async fn init_all(&self) {
        let ctx = self.context();
        for driver in self.registry.ordered() {
            driver.initialize(&ctx).await.expect("driver init");
        }
    }

    pub fn gpio(&self) -> Arc<GpioDriver> {
        self.registry.get_concrete().expect("gpio registered")
    }

    pub fn timer(&self) -> Arc<TimerDriver> {
        self.registry.get_concrete().expect("timer registered")
    }

    pub fn logging(&self) -> Arc<LoggingDriver> {
        self.registry.get_concrete().expect("logging registered")
    }
}
