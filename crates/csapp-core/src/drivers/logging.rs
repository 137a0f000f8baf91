use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use log::{Level, LevelFilter};

use crate::config::LoggingConfig;
use crate::drivers::{expect_ready, DriverError, TimerDriver};
use crate::ipc::{Channel, Device, Request};
use crate::kernel::component::{Driver, DriverContext};
use crate::kernel::error::Result;

#[derive(Debug)]
struct ConsoleLink {
    channel: Arc<Channel>,
    // Source of uptime stamps; absent when no timer driver was constructed
    clock: Option<Arc<TimerDriver>>,
}

/// Console logging through the local server.
///
/// Lines look like `[    1.250] csapp INFO  message`. Every line is also
/// emitted on the `log` facade under the `csapp::console` target.
#[derive(Debug)]
pub struct LoggingDriver {
    prefix: String,
    level: LevelFilter,
    link: OnceLock<ConsoleLink>,
}

impl LoggingDriver {
    pub fn new(config: &LoggingConfig) -> Self {
        Self {
            prefix: config.prefix.clone(),
            level: config.level_filter(),
            link: OnceLock::new(),
        }
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    pub async fn log(&self, level: Level, message: impl AsRef<str>) -> std::result::Result<(), DriverError> {
        let link = self.link.get().ok_or(DriverError::NotInitialized { driver: self.name() })?;
        if !self.enabled(level) {
            return Ok(());
        }
        let message = message.as_ref();
        log::log!(target: "csapp::console", level, "{}", message);

        let line = match &link.clock {
            Some(clock) => {
                let uptime = clock.uptime().await?;
                format!(
                    "[{:>5}.{:03}] {} {:<5} {}",
                    uptime.as_secs(),
                    uptime.subsec_millis(),
                    self.prefix,
                    level,
                    message
                )
            }
            None => format!("{} {:<5} {}", self.prefix, level, message),
        };
        link.channel.call_done(Request::ConsoleWrite { line }).await?;
        Ok(())
    }

    pub async fn error(&self, message: impl AsRef<str>) -> std::result::Result<(), DriverError> {
        self.log(Level::Error, message).await
    }

    pub async fn warn(&self, message: impl AsRef<str>) -> std::result::Result<(), DriverError> {
        self.log(Level::Warn, message).await
    }

    pub async fn info(&self, message: impl AsRef<str>) -> std::result::Result<(), DriverError> {
        self.log(Level::Info, message).await
    }

    pub async fn debug(&self, message: impl AsRef<str>) -> std::result::Result<(), DriverError> {
        self.log(Level::Debug, message).await
    }
}

#[async_trait]
impl Driver for LoggingDriver {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn device(&self) -> Device {
        Device::Logging
    }

    fn is_initialized(&self) -> bool {
        self.link.get().is_some()
    }

    async fn initialize(&self, ctx: &DriverContext<'_>) -> Result<()> {
        if self.is_initialized() {
            return Err(DriverError::AlreadyInitialized { driver: self.name() }.into());
        }
        let reply = ctx.channel.call(Request::DeviceInit { device: Device::Logging }).await?;
        expect_ready(Device::Logging, reply)?;

        let clock = ctx.registry.get_concrete::<TimerDriver>();
        if clock.is_none() {
            log::warn!("logging: no timer driver registered, console lines carry no uptime");
        }
        self.link
            .set(ConsoleLink { channel: Arc::clone(ctx.channel), clock })
            .map_err(|_| DriverError::AlreadyInitialized { driver: self.name() })?;
        log::info!("logging: ready (level {})", self.level);
        Ok(())
    }
}
