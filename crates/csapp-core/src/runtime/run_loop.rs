use crate::drivers::TimerKind;
use crate::event::{DeviceEvent, SystemEvent};
use crate::ipc::Notification;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::kernel::System;
use crate::runtime::{App, LoopControl, Termination};

/// Notification pump between the local server and the application
#[derive(Debug)]
pub struct RunLoop {
    system: System,
}

impl RunLoop {
    pub fn new(system: System) -> Self {
        Self { system }
    }

    pub async fn run<A: App>(self, mut app: A) -> Result<Termination> {
        let name = app.name();
        let mut notifications = self
            .system
            .channel()
            .take_notifications()
            .map_err(|e| Error::lifecycle(KernelLifecyclePhase::AppLoop, Some(name), "no notification stream", e))?;

        self.system.events().dispatch(&SystemEvent::LoopEntered).await;
        log::info!("{}: entering run loop", name);

        loop {
            let notification = match notifications.next().await {
                Ok(notification) => notification,
                Err(e) => {
                    log::error!("{}: lost channel to the local server: {}", name, e);
                    return Err(Error::lifecycle(
                        KernelLifecyclePhase::AppLoop,
                        Some(name),
                        "channel to the local server was lost",
                        e,
                    ));
                }
            };
            let Some(event) = self.translate(notification) else {
                continue;
            };
            log::trace!("{}: {:?}", name, event);

            self.system.events().dispatch(&event).await;
            self.system.events().process_queue().await;

            let control = app
                .on_event(&self.system, &event)
                .await
                .map_err(|e| Error::lifecycle(KernelLifecyclePhase::AppLoop, Some(name), "event handler failed", e))?;
            if let LoopControl::Exit(code) = control {
                log::info!("{}: termination requested with code {}", name, code);
                return Ok(Termination { code });
            }
        }
    }

    // Stale expirations (timer cancelled while in flight) are dropped.
    fn translate(&self, notification: Notification) -> Option<DeviceEvent> {
        match notification {
            Notification::TimerExpired { timer } => {
                let kind = self.system.timer().acknowledge_expiry(timer)?;
                Some(DeviceEvent::TimerExpired { timer, periodic: kind == TimerKind::Periodic })
            }
            Notification::PinChanged { pin, level } => Some(DeviceEvent::PinChanged { pin, level }),
        }
    }
}
