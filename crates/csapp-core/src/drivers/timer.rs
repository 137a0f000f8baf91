use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::TimerConfig;
use crate::drivers::{expect_ready, DriverError};
use crate::ipc::{Channel, Device, IpcError, Reply, Request, ServerFault, TimerId};
use crate::kernel::component::{Driver, DriverContext};
use crate::kernel::error::Result;

/// How an armed timer behaves once it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    OneShot,
    Periodic,
}

#[derive(Debug)]
struct TimerLink {
    channel: Arc<Channel>,
    // Smaller of the configured limit and what the server allows
    max_timers: usize,
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    kind: TimerKind,
    interval_ms: u64,
}

/// Timer service client: one-shot and periodic timers plus uptime.
///
/// Expirations arrive as notifications on the channel; the run loop reports
/// each one through [`TimerDriver::acknowledge_expiry`] so that one-shot
/// timers stop counting against the capacity.
#[derive(Debug)]
pub struct TimerDriver {
    max_timers: usize,
    link: OnceLock<TimerLink>,
    next_id: AtomicU32,
    armed: Mutex<HashMap<TimerId, Armed>>,
}

impl TimerDriver {
    pub fn new(config: &TimerConfig) -> Self {
        Self {
            max_timers: config.max_timers,
            link: OnceLock::new(),
            next_id: AtomicU32::new(1),
            armed: Mutex::new(HashMap::new()),
        }
    }

    fn link(&self) -> std::result::Result<&TimerLink, DriverError> {
        self.link.get().ok_or(DriverError::NotInitialized { driver: self.name() })
    }

    fn armed(&self) -> MutexGuard<'_, HashMap<TimerId, Armed>> {
        self.armed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn arm(&self, interval_ms: u64, kind: TimerKind) -> std::result::Result<TimerId, DriverError> {
        let link = self.link()?;
        if interval_ms == 0 {
            return Err(DriverError::InvalidInterval);
        }
        if self.armed().len() >= link.max_timers {
            return Err(DriverError::CapacityExceeded { max: link.max_timers });
        }

        let timer = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        // Record before the request so an early expiry is never mistaken for a stale one.
        self.armed().insert(timer, Armed { kind, interval_ms });
        let request = Request::TimerArm {
            timer,
            interval_ms,
            periodic: kind == TimerKind::Periodic,
        };
        if let Err(e) = link.channel.call_done(request).await {
            self.armed().remove(&timer);
            return Err(e.into());
        }
        log::debug!("timer: {} armed ({:?}, {} ms)", timer, kind, interval_ms);
        Ok(timer)
    }

    /// Fire once after `interval_ms`.
    pub async fn set_timeout(&self, interval_ms: u64) -> std::result::Result<TimerId, DriverError> {
        self.arm(interval_ms, TimerKind::OneShot).await
    }

    /// Fire every `interval_ms` until cancelled.
    pub async fn set_interval(&self, interval_ms: u64) -> std::result::Result<TimerId, DriverError> {
        self.arm(interval_ms, TimerKind::Periodic).await
    }

    /// Disarm `timer`. A one-shot timer that already fired on the server but
    /// whose expiry has not been acknowledged yet is simply forgotten.
    pub async fn cancel(&self, timer: TimerId) -> std::result::Result<(), DriverError> {
        let link = self.link()?;
        let armed = self.armed().remove(&timer).ok_or(DriverError::UnknownTimer { timer })?;

        match link.channel.call_done(Request::TimerCancel { timer }).await {
            Ok(()) => Ok(()),
            Err(IpcError::Rejected { fault: ServerFault::UnknownTimer(_), .. }) if armed.kind == TimerKind::OneShot => {
                log::debug!("timer: {} already fired, dropped locally", timer);
                Ok(())
            }
            Err(e @ IpcError::Rejected { fault: ServerFault::UnknownTimer(_), .. }) => Err(e.into()),
            Err(e) => {
                self.armed().insert(timer, armed);
                Err(e.into())
            }
        }
    }

    /// Time since the timer service started.
    pub async fn uptime(&self) -> std::result::Result<Duration, DriverError> {
        match self.link()?.channel.call(Request::Uptime).await? {
            Reply::UptimeMs(ms) => Ok(Duration::from_millis(ms)),
            reply => Err(DriverError::Ipc(IpcError::UnexpectedReply { request: "timer.uptime", reply })),
        }
    }

    /// Timers that may be armed at once, known after initialization
    pub fn capacity(&self) -> Option<usize> {
        self.link.get().map(|link| link.max_timers)
    }

    /// Number of timers currently armed
    pub fn active(&self) -> usize {
        self.armed().len()
    }

    pub fn interval_ms(&self, timer: TimerId) -> Option<u64> {
        self.armed().get(&timer).map(|armed| armed.interval_ms)
    }

    /// Record that `timer` fired. Returns its kind, or `None` for a timer that
    /// is no longer armed (cancelled while the expiry was in flight).
    pub fn acknowledge_expiry(&self, timer: TimerId) -> Option<TimerKind> {
        let mut armed = self.armed();
        let kind = armed.get(&timer)?.kind;
        if kind == TimerKind::OneShot {
            armed.remove(&timer);
        }
        Some(kind)
    }
}

#[async_trait]
impl Driver for TimerDriver {
    fn name(&self) -> &'static str {
        "timer"
    }

    fn device(&self) -> Device {
        Device::Timer
    }

    fn is_initialized(&self) -> bool {
        self.link.get().is_some()
    }

    async fn initialize(&self, ctx: &DriverContext<'_>) -> Result<()> {
        if self.is_initialized() {
            return Err(DriverError::AlreadyInitialized { driver: self.name() }.into());
        }
        let reply = ctx.channel.call(Request::DeviceInit { device: Device::Timer }).await?;
        let offered = expect_ready(Device::Timer, reply)?;
        let max_timers = usize::try_from(offered).unwrap_or(usize::MAX).min(self.max_timers);
        if max_timers < self.max_timers {
            log::warn!("timer: server allows {} timers, {} configured", offered, self.max_timers);
        }

        let link = TimerLink { channel: Arc::clone(ctx.channel), max_timers };
        self.link
            .set(link)
            .map_err(|_| DriverError::AlreadyInitialized { driver: self.name() })?;
        log::info!("timer: ready with {} slots", max_timers);
        Ok(())
    }
}
