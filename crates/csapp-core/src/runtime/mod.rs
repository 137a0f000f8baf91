//! # csapp Runtime
//!
//! The application side of the handoff. An [`App`] receives the initialized
//! [`System`] in [`App::setup`], then [`App::start_loop`] takes ownership of
//! it. The default loop is [`RunLoop`], which turns server notifications into
//! [`DeviceEvent`]s and feeds them to [`App::on_event`].
pub mod run_loop;

use async_trait::async_trait;

use crate::event::DeviceEvent;
use crate::kernel::error::Result;
use crate::kernel::System;

pub use run_loop::RunLoop;

/// What the application wants the loop to do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    /// Leave the loop and terminate the process with this code
    Exit(i32),
}

/// Requested process termination, the only normal way out of the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Termination {
    pub code: i32,
}

/// User hooks invoked once bootstrap has completed.
#[async_trait]
pub trait App: Send + 'static {
    fn name(&self) -> &'static str {
        "app"
    }

    /// Called exactly once, after every driver is initialized.
    async fn setup(&mut self, system: &System) -> Result<()>;

    async fn on_event(&mut self, _system: &System, _event: &DeviceEvent) -> Result<LoopControl> {
        Ok(LoopControl::Continue)
    }

    /// Takes over for the rest of the process. Returns only on requested
    /// termination or when the channel to the server is lost.
    async fn start_loop(self, system: System) -> Result<Termination>
    where
        Self: Sized,
    {
        RunLoop::new(system).run(self).await
    }
}
