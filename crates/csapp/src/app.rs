use async_trait::async_trait;
use csapp_core::ipc::{Level, PinId, PinMode, TimerId};
use csapp_core::{App, DeviceEvent, LoopControl, Result, System};

/// Blinks an LED a fixed number of times, then asks to terminate.
#[derive(Debug)]
pub struct Blinky {
    pin: PinId,
    interval_ms: u64,
    toggles_left: u32,
    timer: Option<TimerId>,
}

impl Blinky {
    pub fn new(pin: PinId, interval_ms: u64, blinks: u32) -> Self {
        Self {
            pin,
            interval_ms,
            // on and off
            toggles_left: blinks.saturating_mul(2),
            timer: None,
        }
    }
}

#[async_trait]
impl App for Blinky {
    fn name(&self) -> &'static str {
        "blinky"
    }

    async fn setup(&mut self, system: &System) -> Result<()> {
        let gpio = system.gpio();
        gpio.configure(self.pin, PinMode::Output).await?;
        gpio.write(self.pin, Level::Low).await?;
        self.timer = Some(system.timer().set_interval(self.interval_ms).await?);

        system
            .logging()
            .info(format!("blinky: ready, pin {} every {} ms", self.pin, self.interval_ms))
            .await?;
        Ok(())
    }

    async fn on_event(&mut self, system: &System, event: &DeviceEvent) -> Result<LoopControl> {
        let DeviceEvent::TimerExpired { timer, .. } = event else {
            return Ok(LoopControl::Continue);
        };
        if self.timer != Some(*timer) {
            return Ok(LoopControl::Continue);
        }

        let level = system.gpio().toggle(self.pin).await?;
        system.logging().info(format!("blinky: pin {} -> {}", self.pin, level)).await?;
        self.toggles_left = self.toggles_left.saturating_sub(1);
        if self.toggles_left > 0 {
            return Ok(LoopControl::Continue);
        }

        system.timer().cancel(*timer).await?;
        self.timer = None;
        system.logging().info("blinky: done").await?;
        Ok(LoopControl::Exit(0))
    }
}
