use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::config::BootConfig;
use crate::drivers::{GpioDriver, LoggingDriver, TimerDriver};
use crate::event::{EventManager, SystemEvent};
use crate::ipc::{Channel, Connector, Device, IpcError};
use crate::kernel::component::{Driver, DriverContext, DriverRegistry};
use crate::kernel::constants;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::kernel::System;
use crate::runtime::{App, Termination};

/// Order in which driver singletons are constructed and then initialized
pub const DRIVER_ORDER: [Device; 3] = [Device::Gpio, Device::Timer, Device::Logging];

/// Progress of the one-time bootstrap pass. Transitions only ever go to [`BootPhase::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootPhase {
    Uninitialized,
    ChannelReady,
    DriversConstructed,
    DriversInitialized,
    AppSetupDone,
    Running,
}

impl BootPhase {
    pub fn next(self) -> Option<BootPhase> {
        match self {
            BootPhase::Uninitialized => Some(BootPhase::ChannelReady),
            BootPhase::ChannelReady => Some(BootPhase::DriversConstructed),
            BootPhase::DriversConstructed => Some(BootPhase::DriversInitialized),
            BootPhase::DriversInitialized => Some(BootPhase::AppSetupDone),
            BootPhase::AppSetupDone => Some(BootPhase::Running),
            BootPhase::Running => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BootPhase::Uninitialized => "uninitialized",
            BootPhase::ChannelReady => "channel-ready",
            BootPhase::DriversConstructed => "drivers-constructed",
            BootPhase::DriversInitialized => "drivers-initialized",
            BootPhase::AppSetupDone => "app-setup-done",
            BootPhase::Running => "running",
        }
    }
}

impl fmt::Display for BootPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinates the single bootstrap pass: channel, drivers, application.
///
/// [`Bootstrap::run`] consumes the coordinator, so the sequence can only be
/// executed once per instance.
pub struct Bootstrap<C> {
    config: Arc<BootConfig>,
    connector: C,
    events: Arc<EventManager>,
    phase: BootPhase,
}

impl<C> fmt::Debug for Bootstrap<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bootstrap")
            .field("service", &self.config.service())
            .field("phase", &self.phase)
            .finish()
    }
}

impl<C: Connector> Bootstrap<C> {
    pub fn new(config: BootConfig, connector: C) -> Self {
        Self {
            config: Arc::new(config),
            connector,
            events: Arc::new(EventManager::new()),
            phase: BootPhase::Uninitialized,
        }
    }

    /// Use a caller-provided event manager, e.g. one with handlers already registered.
    pub fn with_events(mut self, events: Arc<EventManager>) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &Arc<EventManager> {
        &self.events
    }

    pub fn phase(&self) -> BootPhase {
        self.phase
    }

    /// Run the whole sequence and hand control to `app`.
    ///
    /// Returns only if the application loop ends, or with the first fatal error.
    pub async fn run<A: App>(mut self, mut app: A) -> Result<Termination> {
        log::info!("Starting {} v{}", constants::APP_NAME, constants::APP_VERSION);

        let channel = self.acquire_channel().await?;
        let registry = self.construct_drivers().await?;
        self.init_drivers(&channel, &registry).await?;

        let system = System::assemble(channel, registry, Arc::clone(&self.events), Arc::clone(&self.config))?;

        let name = app.name();
        log::info!("Running setup for {}", name);
        if let Err(e) = app.setup(&system).await {
            log::error!("Setup of {} failed: {}", name, e);
            return Err(Error::lifecycle(KernelLifecyclePhase::AppSetup, Some(name), "application setup failed", e));
        }
        self.advance(BootPhase::AppSetupDone).await?;

        self.advance(BootPhase::Running).await?;
        log::info!("Handing control to {}", name);
        app.start_loop(system).await
    }

    async fn advance(&mut self, next: BootPhase) -> Result<()> {
        if self.phase.next() != Some(next) {
            return Err(Error::KernelLifecycleError {
                phase: KernelLifecyclePhase::Transition,
                component_name: None,
                message: format!("illegal transition {} -> {}", self.phase, next),
                source: None,
            });
        }
        log::debug!("Boot phase {} -> {}", self.phase, next);
        self.phase = next;
        self.events.dispatch(&SystemEvent::PhaseEntered { phase: next }).await;
        Ok(())
    }

    async fn acquire_channel(&mut self) -> Result<Arc<Channel>> {
        let service = self.config.service();
        let timeout = self.config.connect_timeout();
        log::info!("Connecting to local {}", service);

        let outcome = match tokio::time::timeout(timeout, self.connector.connect_to_local(service)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(IpcError::ConnectTimeout {
                service,
                timeout_ms: self.config.server.connect_timeout_ms,
            }),
        };
        let channel = match outcome {
            Ok(channel) => Arc::new(channel),
            Err(e) => {
                log::error!("Failed to connect to {}: {}", service, e);
                return Err(Error::lifecycle(
                    KernelLifecyclePhase::AcquireChannel,
                    None,
                    format!("cannot open a channel to {}", service),
                    e,
                ));
            }
        };
        log::info!("Channel {} open to {}", channel.id(), service);

        self.advance(BootPhase::ChannelReady).await?;
        Ok(channel)
    }

    async fn construct_drivers(&mut self) -> Result<DriverRegistry> {
        let mut registry = DriverRegistry::new();
        for device in DRIVER_ORDER {
            let name = construct(&mut registry, &self.config, device).map_err(|e| {
                Error::lifecycle(KernelLifecyclePhase::ConstructDrivers, Some(device.as_str()), "driver construction failed", e)
            })?;
            log::debug!("Constructed driver: {}", name);
            self.events.dispatch(&SystemEvent::DriverConstructed { driver: name }).await;
        }

        self.advance(BootPhase::DriversConstructed).await?;
        Ok(registry)
    }

    async fn init_drivers(&mut self, channel: &Arc<Channel>, registry: &DriverRegistry) -> Result<()> {
        log::info!("Initializing drivers...");
        let ctx = DriverContext {
            channel,
            config: &self.config,
            registry,
        };
        for driver in registry.ordered() {
            log::info!("Initializing driver: {}", driver.name());
            if let Err(e) = driver.initialize(&ctx).await {
                log::error!("Driver {} failed to initialize: {}", driver.name(), e);
                return Err(Error::lifecycle(
                    KernelLifecyclePhase::InitDrivers,
                    Some(driver.name()),
                    "driver failed to initialize",
                    e,
                ));
            }
            self.events.dispatch(&SystemEvent::DriverInitialized { driver: driver.name() }).await;
        }
        log::info!("Driver initialization complete.");

        self.advance(BootPhase::DriversInitialized).await
    }
}

fn construct(registry: &mut DriverRegistry, config: &BootConfig, device: Device) -> Result<&'static str> {
    match device {
        Device::Gpio => register(registry, GpioDriver::new(&config.gpio)),
        Device::Timer => register(registry, TimerDriver::new(&config.timer)),
        Device::Logging => register(registry, LoggingDriver::new(&config.logging)),
    }
}

fn register<D: Driver>(registry: &mut DriverRegistry, driver: D) -> Result<&'static str> {
    let name = driver.name();
    registry.register_instance(Arc::new(driver))?;
    Ok(name)
}

/// Process entry point: boot `app` on a single-threaded runtime, then exit.
///
/// Exits with the application's code on requested termination and with
/// [`constants::FATAL_EXIT_CODE`] on any bootstrap or loop failure.
pub fn startup<C, A>(config: BootConfig, connector: C, app: A) -> !
where
    C: Connector,
    A: App,
{
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => fatal(&Error::Other(format!("cannot build async runtime: {}", e))),
    };
    match runtime.block_on(Bootstrap::new(config, connector).run(app)) {
        Ok(termination) => {
            log::info!("Application terminated with code {}", termination.code);
            std::process::exit(termination.code)
        }
        Err(e) => fatal(&e),
    }
}

fn fatal(error: &Error) -> ! {
    log::error!("Bootstrap aborted: {}", error);
    eprintln!("fatal: {}", report(error));
    std::process::exit(constants::FATAL_EXIT_CODE)
}

/// The error followed by each of its causes.
pub fn report(error: &Error) -> String {
    let mut message = error.to_string();
    let mut cause = error.source();
    while let Some(inner) = cause {
        let text = inner.to_string();
        // Wrapping variants already print their payload.
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        cause = inner.source();
    }
    message
}
