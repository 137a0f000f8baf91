use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use async_trait::async_trait;

use crate::config::GpioConfig;
use crate::drivers::{expect_ready, DriverError};
use crate::ipc::{Channel, Device, IpcError, Level, PinId, PinMode, Reply, Request};
use crate::kernel::component::{Driver, DriverContext};
use crate::kernel::error::Result;

#[derive(Debug)]
struct GpioLink {
    channel: Arc<Channel>,
    pin_count: u8,
}

/// General purpose I/O pins served by the local server
#[derive(Debug)]
pub struct GpioDriver {
    configured_pins: u8,
    link: OnceLock<GpioLink>,
    modes: Mutex<HashMap<PinId, PinMode>>,
}

impl GpioDriver {
    pub fn new(config: &GpioConfig) -> Self {
        Self {
            configured_pins: config.pin_count,
            link: OnceLock::new(),
            modes: Mutex::new(HashMap::new()),
        }
    }

    fn link(&self) -> std::result::Result<&GpioLink, DriverError> {
        self.link.get().ok_or(DriverError::NotInitialized { driver: self.name() })
    }

    fn checked(&self, pin: PinId) -> std::result::Result<&GpioLink, DriverError> {
        let link = self.link()?;
        if pin >= link.pin_count {
            return Err(DriverError::InvalidPin { pin, pin_count: link.pin_count });
        }
        Ok(link)
    }

    fn require_mode(&self, pin: PinId, required: PinMode) -> std::result::Result<(), DriverError> {
        match self.mode(pin) {
            Some(mode) if mode == required => Ok(()),
            actual => Err(DriverError::WrongMode { pin, required, actual }),
        }
    }

    /// Usable pins: the smaller of the configured count and what the server offers
    pub fn pin_count(&self) -> Option<u8> {
        self.link.get().map(|link| link.pin_count)
    }

    pub fn mode(&self, pin: PinId) -> Option<PinMode> {
        self.modes.lock().unwrap_or_else(PoisonError::into_inner).get(&pin).copied()
    }

    pub async fn configure(&self, pin: PinId, mode: PinMode) -> std::result::Result<(), DriverError> {
        let link = self.checked(pin)?;
        link.channel.call_done(Request::GpioConfigure { pin, mode }).await?;
        self.modes.lock().unwrap_or_else(PoisonError::into_inner).insert(pin, mode);
        log::debug!("gpio: pin {} configured as {}", pin, mode);
        Ok(())
    }

    pub async fn write(&self, pin: PinId, level: Level) -> std::result::Result<(), DriverError> {
        let link = self.checked(pin)?;
        self.require_mode(pin, PinMode::Output)?;
        link.channel.call_done(Request::GpioWrite { pin, level }).await?;
        Ok(())
    }

    pub async fn read(&self, pin: PinId) -> std::result::Result<Level, DriverError> {
        let link = self.checked(pin)?;
        if self.mode(pin).is_none() {
            return Err(DriverError::Unconfigured { pin });
        }
        match link.channel.call(Request::GpioRead { pin }).await? {
            Reply::Level(level) => Ok(level),
            reply => Err(DriverError::Ipc(IpcError::UnexpectedReply { request: "gpio.read", reply })),
        }
    }

    /// Invert an output pin and return the new level.
    pub async fn toggle(&self, pin: PinId) -> std::result::Result<Level, DriverError> {
        self.require_mode(pin, PinMode::Output)?;
        let level = self.read(pin).await?.toggled();
        self.write(pin, level).await?;
        Ok(level)
    }

    /// Subscribe to `PinChanged` notifications for an input pin.
    pub async fn watch(&self, pin: PinId) -> std::result::Result<(), DriverError> {
        let link = self.checked(pin)?;
        self.require_mode(pin, PinMode::Input)?;
        link.channel.call_done(Request::GpioWatch { pin }).await?;
        Ok(())
    }
}

#[async_trait]
impl Driver for GpioDriver {
    fn name(&self) -> &'static str {
        "gpio"
    }

    fn device(&self) -> Device {
        Device::Gpio
    }

    fn is_initialized(&self) -> bool {
        self.link.get().is_some()
    }

    async fn initialize(&self, ctx: &DriverContext<'_>) -> Result<()> {
        if self.is_initialized() {
            return Err(DriverError::AlreadyInitialized { driver: self.name() }.into());
        }
        let reply = ctx.channel.call(Request::DeviceInit { device: Device::Gpio }).await?;
        let offered = expect_ready(Device::Gpio, reply)?;
        let pin_count = u8::try_from(offered).unwrap_or(u8::MAX).min(self.configured_pins);
        if pin_count < self.configured_pins {
            log::warn!("gpio: server offers {} pins, {} configured", offered, self.configured_pins);
        }

        let link = GpioLink { channel: Arc::clone(ctx.channel), pin_count };
        self.link
            .set(link)
            .map_err(|_| DriverError::AlreadyInitialized { driver: self.name() })?;
        log::info!("gpio: ready with {} pins", pin_count);
        Ok(())
    }
}
