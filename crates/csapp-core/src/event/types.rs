use std::any::Any;

use crate::event::Event;
use crate::ipc::{Level, PinId, TimerId};
use crate::kernel::bootstrap::BootPhase;

/// Milestones of the bootstrap sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemEvent {
    /// The coordinator moved to a new phase
    PhaseEntered { phase: BootPhase },
    /// A driver singleton was constructed (no hardware touched yet)
    DriverConstructed { driver: &'static str },
    /// A driver finished bringing its device up
    DriverInitialized { driver: &'static str },
    /// Control reached the application's run loop
    LoopEntered,
}

impl Event for SystemEvent {
    fn name(&self) -> &'static str {
        match self {
            SystemEvent::PhaseEntered { .. } => "boot.phase",
            SystemEvent::DriverConstructed { .. } => "boot.driver_constructed",
            SystemEvent::DriverInitialized { .. } => "boot.driver_initialized",
            SystemEvent::LoopEntered => "app.loop_entered",
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Hardware notifications delivered by the run loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    TimerExpired { timer: TimerId, periodic: bool },
    PinChanged { pin: PinId, level: Level },
}

impl Event for DeviceEvent {
    fn name(&self) -> &'static str {
        match self {
            DeviceEvent::TimerExpired { .. } => "timer.expired",
            DeviceEvent::PinChanged { .. } => "gpio.pin_changed",
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
