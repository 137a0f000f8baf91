//! In-process stand-in for the primary local service.
//!
//! Every accepted channel is served by its own tokio task. Device state
//! (pin levels, armed timers, console) is shared across channels, and every
//! request is appended to a journal so callers can inspect what reached the
//! "hardware" and in which order.
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant as StdInstant};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::BootConfig;
use crate::ipc::channel::{Channel, Envelope};
use crate::ipc::error::IpcError;
use crate::ipc::message::{Device, Level, Notification, PinId, PinMode, Reply, Request, ServerFault, TimerId};
use crate::ipc::{ChannelId, Connector, ServiceId};
use crate::kernel::constants;

/// What the server saw, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    Accepted { channel: ChannelId },
    Request { channel: ChannelId, request: Request },
}

#[derive(Debug, Clone)]
struct ServerOptions {
    pin_count: u8,
    timer_capacity: u32,
    refuse_connections: bool,
    failing_devices: HashSet<Device>,
    echo_console: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            pin_count: constants::DEFAULT_PIN_COUNT,
            timer_capacity: constants::DEFAULT_MAX_TIMERS as u32,
            refuse_connections: false,
            failing_devices: HashSet::new(),
            echo_console: false,
        }
    }
}

/// Builder for [`LocalServer`]
#[derive(Debug, Clone, Default)]
pub struct LocalServerBuilder {
    options: ServerOptions,
}

impl LocalServerBuilder {
    pub fn pin_count(mut self, pin_count: u8) -> Self {
        self.options.pin_count = pin_count;
        self
    }

    pub fn timer_capacity(mut self, capacity: u32) -> Self {
        self.options.timer_capacity = capacity;
        self
    }

    /// Reject every connection attempt
    pub fn refuse_connections(mut self, refuse: bool) -> Self {
        self.options.refuse_connections = refuse;
        self
    }

    /// Make `DeviceInit` for `device` fail
    pub fn fail_device(mut self, device: Device) -> Self {
        self.options.failing_devices.insert(device);
        self
    }

    /// Print console lines to stdout as well as recording them
    pub fn echo_console(mut self, echo: bool) -> Self {
        self.options.echo_console = echo;
        self
    }

    pub fn build(self) -> LocalServer {
        let (shutdown, _) = watch::channel(false);
        LocalServer {
            shared: Arc::new(Shared {
                options: self.options,
                state: Mutex::new(ServerState::new()),
                shutdown,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PinState {
    mode: Option<PinMode>,
    level: Level,
}

#[derive(Debug)]
struct ServerState {
    started: StdInstant,
    next_channel: u32,
    closed: bool,
    ready: HashSet<Device>,
    pins: HashMap<PinId, PinState>,
    watchers: HashMap<PinId, HashSet<ChannelId>>,
    timers: HashMap<(ChannelId, TimerId), JoinHandle<()>>,
    subscribers: HashMap<ChannelId, mpsc::UnboundedSender<Notification>>,
    console: Vec<String>,
    journal: Vec<JournalEntry>,
}

impl ServerState {
    fn new() -> Self {
        Self {
            started: StdInstant::now(),
            next_channel: 1,
            closed: false,
            ready: HashSet::new(),
            pins: HashMap::new(),
            watchers: HashMap::new(),
            timers: HashMap::new(),
            subscribers: HashMap::new(),
            console: Vec::new(),
            journal: Vec::new(),
        }
    }

    fn require_ready(&self, device: Device) -> Result<(), ServerFault> {
        if self.ready.contains(&device) {
            Ok(())
        } else {
            Err(ServerFault::NotReady(device))
        }
    }

    fn notify(&self, channel: ChannelId, notification: Notification) -> bool {
        match self.subscribers.get(&channel) {
            Some(sender) => sender.send(notification).is_ok(),
            None => false,
        }
    }
}

#[derive(Debug)]
struct Shared {
    options: ServerOptions,
    state: Mutex<ServerState>,
    shutdown: watch::Sender<bool>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_pin(&self, pin: PinId) -> Result<(), ServerFault> {
        if pin < self.options.pin_count {
            Ok(())
        } else {
            Err(ServerFault::InvalidPin { pin, pin_count: self.options.pin_count })
        }
    }

    fn handle(self: &Arc<Self>, channel: ChannelId, request: Request) -> Result<Reply, ServerFault> {
        let mut state = self.state();
        state.journal.push(JournalEntry::Request { channel, request: request.clone() });

        if !matches!(request, Request::DeviceInit { .. }) {
            state.require_ready(request.device())?;
        }

        match request {
            Request::DeviceInit { device } => {
                if self.options.failing_devices.contains(&device) {
                    return Err(ServerFault::DeviceUnavailable(device));
                }
                state.ready.insert(device);
                let capacity = match device {
                    Device::Gpio => u32::from(self.options.pin_count),
                    Device::Timer => self.options.timer_capacity,
                    Device::Logging => 0,
                };
                Ok(Reply::DeviceReady { device, capacity })
            }
            Request::GpioConfigure { pin, mode } => {
                self.check_pin(pin)?;
                state.pins.entry(pin).or_default().mode = Some(mode);
                if mode == PinMode::Output {
                    if let Some(watchers) = state.watchers.get_mut(&pin) {
                        watchers.clear();
                    }
                }
                Ok(Reply::Done)
            }
            Request::GpioWrite { pin, level } => {
                self.check_pin(pin)?;
                let entry = state.pins.entry(pin).or_default();
                if entry.mode != Some(PinMode::Output) {
                    return Err(ServerFault::WrongMode { pin, expected: PinMode::Output });
                }
                entry.level = level;
                Ok(Reply::Done)
            }
            Request::GpioRead { pin } => {
                self.check_pin(pin)?;
                match state.pins.get(&pin) {
                    Some(PinState { mode: Some(_), level }) => Ok(Reply::Level(*level)),
                    _ => Err(ServerFault::Unconfigured(pin)),
                }
            }
            Request::GpioWatch { pin } => {
                self.check_pin(pin)?;
                let mode = state.pins.get(&pin).and_then(|p| p.mode);
                if mode != Some(PinMode::Input) {
                    return Err(ServerFault::WrongMode { pin, expected: PinMode::Input });
                }
                state.watchers.entry(pin).or_default().insert(channel);
                Ok(Reply::Done)
            }
            Request::TimerArm { timer, interval_ms, periodic } => {
                let armed = state.timers.keys().filter(|(owner, _)| *owner == channel).count();
                let key = (channel, timer);
                if !state.timers.contains_key(&key) && armed >= self.options.timer_capacity as usize {
                    return Err(ServerFault::TimerLimit { capacity: self.options.timer_capacity });
                }
                let task = self.spawn_timer(channel, timer, interval_ms, periodic);
                if let Some(previous) = state.timers.insert(key, task) {
                    previous.abort();
                }
                Ok(Reply::Done)
            }
            Request::TimerCancel { timer } => match state.timers.remove(&(channel, timer)) {
                Some(task) => {
                    task.abort();
                    Ok(Reply::Done)
                }
                None => Err(ServerFault::UnknownTimer(timer)),
            },
            Request::Uptime => {
                let elapsed = state.started.elapsed().as_millis();
                Ok(Reply::UptimeMs(u64::try_from(elapsed).unwrap_or(u64::MAX)))
            }
            Request::ConsoleWrite { line } => {
                if self.options.echo_console {
                    println!("{}", line);
                }
                state.console.push(line);
                Ok(Reply::Done)
            }
        }
    }

    fn spawn_timer(self: &Arc<Self>, channel: ChannelId, timer: TimerId, interval_ms: u64, periodic: bool) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        let period = Duration::from_millis(interval_ms.max(1));
        tokio::spawn(async move {
            let mut ticks = time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let mut state = shared.state();
                if !state.notify(channel, Notification::TimerExpired { timer }) {
                    state.timers.remove(&(channel, timer));
                    break;
                }
                if !periodic {
                    state.timers.remove(&(channel, timer));
                    break;
                }
            }
        })
    }

    fn detach(&self, channel: ChannelId) {
        let mut state = self.state();
        state.subscribers.remove(&channel);
        for watchers in state.watchers.values_mut() {
            watchers.remove(&channel);
        }
        let owned: Vec<_> = state.timers.keys().filter(|(owner, _)| *owner == channel).copied().collect();
        for key in owned {
            if let Some(task) = state.timers.remove(&key) {
                task.abort();
            }
        }
        log::debug!("[local-server] {} detached", channel);
    }
}

async fn serve(shared: Arc<Shared>, channel: ChannelId, mut requests: mpsc::UnboundedReceiver<Envelope>) {
    let mut shutdown = shared.shutdown.subscribe();
    if !*shutdown.borrow_and_update() {
        loop {
            // Shutdown wins over requests already queued.
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                envelope = requests.recv() => match envelope {
                    Some(Envelope { request, reply_to }) => {
                        let outcome = shared.handle(channel, request);
                        // The caller may have given up waiting.
                        let _ = reply_to.send(outcome);
                    }
                    None => break,
                },
            }
        }
    }
    shared.detach(channel);
}

/// Handle to an in-process local server. Clones share the same server.
#[derive(Debug, Clone)]
pub struct LocalServer {
    shared: Arc<Shared>,
}

impl LocalServer {
    pub fn builder() -> LocalServerBuilder {
        LocalServerBuilder::default()
    }

    /// Build a server sized and configured from the boot configuration.
    pub fn from_config(config: &BootConfig) -> Self {
        let mut builder = Self::builder()
            .pin_count(config.gpio.pin_count)
            .timer_capacity(u32::try_from(config.timer.max_timers).unwrap_or(u32::MAX))
            .refuse_connections(config.simulator.refuse_connections)
            .echo_console(config.simulator.echo_console);
        for device in &config.simulator.failing_devices {
            builder = builder.fail_device(*device);
        }
        builder.build()
    }

    /// Accept a new channel. Must be called from within a tokio runtime.
    pub fn accept(&self, service: ServiceId) -> Result<Channel, IpcError> {
        if self.shared.options.refuse_connections {
            return Err(IpcError::ConnectionRefused { service, reason: "connections are disabled".to_string() });
        }

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let channel = {
            let mut state = self.shared.state();
            if state.closed {
                return Err(IpcError::ConnectionRefused { service, reason: "server is shut down".to_string() });
            }
            let channel = ChannelId(state.next_channel);
            state.next_channel += 1;
            state.subscribers.insert(channel, notify_tx);
            state.journal.push(JournalEntry::Accepted { channel });
            channel
        };

        tokio::spawn(serve(Arc::clone(&self.shared), channel, request_rx));
        log::debug!("[local-server] accepted {} for {}", channel, service);
        Ok(Channel::from_parts(channel, service, request_tx, notify_rx))
    }

    /// Close every channel and refuse new ones.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state();
            state.closed = true;
            state.subscribers.clear();
            for (_, task) in state.timers.drain() {
                task.abort();
            }
        }
        self.shared.shutdown.send_replace(true);
        log::info!("[local-server] shut down");
    }

    /// Drive an input pin from outside, notifying channels watching it.
    pub fn set_input_level(&self, pin: PinId, level: Level) -> Result<(), ServerFault> {
        self.shared.check_pin(pin)?;
        let mut state = self.shared.state();
        let pin_state = state.pins.entry(pin).or_default();
        if pin_state.mode != Some(PinMode::Input) {
            return Err(ServerFault::WrongMode { pin, expected: PinMode::Input });
        }
        if pin_state.level == level {
            return Ok(());
        }
        pin_state.level = level;

        let watchers: Vec<ChannelId> = state.watchers.get(&pin).map(|w| w.iter().copied().collect()).unwrap_or_default();
        for channel in watchers {
            state.notify(channel, Notification::PinChanged { pin, level });
        }
        Ok(())
    }

    pub fn journal(&self) -> Vec<JournalEntry> {
        self.shared.state().journal.clone()
    }

    /// Requests received so far, without the channel they arrived on
    pub fn requests(&self) -> Vec<Request> {
        self.shared
            .state()
            .journal
            .iter()
            .filter_map(|entry| match entry {
                JournalEntry::Request { request, .. } => Some(request.clone()),
                JournalEntry::Accepted { .. } => None,
            })
            .collect()
    }

    pub fn console(&self) -> Vec<String> {
        self.shared.state().console.clone()
    }

    pub fn pin_level(&self, pin: PinId) -> Option<Level> {
        self.shared.state().pins.get(&pin).filter(|p| p.mode.is_some()).map(|p| p.level)
    }

    pub fn armed_timers(&self) -> usize {
        self.shared.state().timers.len()
    }

    pub fn is_ready(&self, device: Device) -> bool {
        self.shared.state().ready.contains(&device)
    }
}

/// [`Connector`] resolving service ids to in-process servers
#[derive(Debug, Clone, Default)]
pub struct LocalConnector {
    services: HashMap<ServiceId, LocalServer>,
}

impl LocalConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, service: ServiceId, server: LocalServer) -> Self {
        self.register(service, server);
        self
    }

    pub fn register(&mut self, service: ServiceId, server: LocalServer) {
        self.services.insert(service, server);
    }

    pub fn server(&self, service: ServiceId) -> Option<&LocalServer> {
        self.services.get(&service)
    }
}

#[async_trait]
impl Connector for LocalConnector {
    async fn connect_to_local(&self, service: ServiceId) -> Result<Channel, IpcError> {
        self.services
            .get(&service)
            .ok_or(IpcError::ServiceNotFound { service })?
            .accept(service)
    }
}
