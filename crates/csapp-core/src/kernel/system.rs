use std::any::type_name;
use std::sync::Arc;

use crate::config::BootConfig;
use crate::drivers::{GpioDriver, LoggingDriver, TimerDriver};
use crate::event::EventManager;
use crate::ipc::Channel;
use crate::kernel::component::{Driver, DriverRegistry};
use crate::kernel::error::{Error, Result};

/// Everything bootstrap produced, handed to the application.
///
/// Clones share the same channel, drivers and event manager.
#[derive(Debug, Clone)]
pub struct System {
    channel: Arc<Channel>,
    gpio: Arc<GpioDriver>,
    timer: Arc<TimerDriver>,
    logging: Arc<LoggingDriver>,
    registry: Arc<DriverRegistry>,
    events: Arc<EventManager>,
    config: Arc<BootConfig>,
}

impl System {
    pub(crate) fn assemble(
        channel: Arc<Channel>,
        registry: DriverRegistry,
        events: Arc<EventManager>,
        config: Arc<BootConfig>,
    ) -> Result<Self> {
        Ok(Self {
            gpio: Self::lookup(&registry)?,
            timer: Self::lookup(&registry)?,
            logging: Self::lookup(&registry)?,
            channel,
            registry: Arc::new(registry),
            events,
            config,
        })
    }

    fn lookup<T: Driver>(registry: &DriverRegistry) -> Result<Arc<T>> {
        registry.get_concrete::<T>().ok_or_else(|| Error::ComponentRegistryError {
            operation: "AssembleSystem".to_string(),
            component_name: Some(type_name::<T>().to_string()),
            message: "driver missing from registry".to_string(),
        })
    }

    pub fn channel(&self) -> &Arc<Channel> {
        &self.channel
    }

    pub fn gpio(&self) -> &Arc<GpioDriver> {
        &self.gpio
    }

    pub fn timer(&self) -> &Arc<TimerDriver> {
        &self.timer
    }

    pub fn logging(&self) -> &Arc<LoggingDriver> {
        &self.logging
    }

    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    pub fn events(&self) -> &Arc<EventManager> {
        &self.events
    }

    pub fn config(&self) -> &BootConfig {
        &self.config
    }
}
