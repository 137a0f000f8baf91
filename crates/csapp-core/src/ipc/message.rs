use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// GPIO pin number
pub type PinId = u8;

/// Peripheral families served by the primary local service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Gpio,
    Timer,
    Logging,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Gpio => "gpio",
            Device::Timer => "timer",
            Device::Logging => "logging",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle of a timer armed through the timer service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u32);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinMode::Input => f.write_str("input"),
            PinMode::Output => f.write_str("output"),
        }
    }
}

/// Logic level of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    pub fn toggled(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => f.write_str("low"),
            Level::High => f.write_str("high"),
        }
    }
}

/// Requests a driver can send over its channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Bring a device to its operational state
    DeviceInit { device: Device },
    GpioConfigure { pin: PinId, mode: PinMode },
    GpioWrite { pin: PinId, level: Level },
    GpioRead { pin: PinId },
    /// Ask for `PinChanged` notifications on an input pin
    GpioWatch { pin: PinId },
    TimerArm { timer: TimerId, interval_ms: u64, periodic: bool },
    TimerCancel { timer: TimerId },
    Uptime,
    ConsoleWrite { line: String },
}

impl Request {
    /// Short name used in errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            Request::DeviceInit { .. } => "device.init",
            Request::GpioConfigure { .. } => "gpio.configure",
            Request::GpioWrite { .. } => "gpio.write",
            Request::GpioRead { .. } => "gpio.read",
            Request::GpioWatch { .. } => "gpio.watch",
            Request::TimerArm { .. } => "timer.arm",
            Request::TimerCancel { .. } => "timer.cancel",
            Request::Uptime => "timer.uptime",
            Request::ConsoleWrite { .. } => "console.write",
        }
    }

    /// The device whose service handles this request
    pub fn device(&self) -> Device {
        match self {
            Request::DeviceInit { device } => *device,
            Request::GpioConfigure { .. }
            | Request::GpioWrite { .. }
            | Request::GpioRead { .. }
            | Request::GpioWatch { .. } => Device::Gpio,
            Request::TimerArm { .. } | Request::TimerCancel { .. } | Request::Uptime => Device::Timer,
            Request::ConsoleWrite { .. } => Device::Logging,
        }
    }
}

/// Successful replies from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Done,
    /// `capacity` is the number of pins for GPIO and of timers for the timer service
    DeviceReady { device: Device, capacity: u32 },
    Level(Level),
    UptimeMs(u64),
}

/// Reasons the server rejects a request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerFault {
    #[error("device '{0}' is unavailable")]
    DeviceUnavailable(Device),

    #[error("device '{0}' has not been initialized")]
    NotReady(Device),

    #[error("pin {pin} is out of range (pin count {pin_count})")]
    InvalidPin { pin: PinId, pin_count: u8 },

    #[error("pin {pin} is not configured as {expected}")]
    WrongMode { pin: PinId, expected: PinMode },

    #[error("pin {0} has not been configured")]
    Unconfigured(PinId),

    #[error("timer capacity of {capacity} reached")]
    TimerLimit { capacity: u32 },

    #[error("{0} is not armed")]
    UnknownTimer(TimerId),
}

/// Unsolicited messages pushed by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    TimerExpired { timer: TimerId },
    PinChanged { pin: PinId, level: Level },
}
