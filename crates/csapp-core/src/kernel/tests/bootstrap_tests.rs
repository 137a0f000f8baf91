use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::BootConfig;
use crate::event::{DeviceEvent, EventManager, EventResult, SystemEvent};
use crate::ipc::{Channel, Connector, Device, IpcError, JournalEntry, LocalConnector, LocalServer, Request, ServiceId, PRIMARY_LOCAL_SERVICE};
use crate::kernel::bootstrap::*;
use crate::kernel::component::Driver;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::kernel::System;
use crate::runtime::{App, LoopControl, Termination};

type Trace = Arc<Mutex<Vec<String>>>;

/// Records every hook call; optionally fails setup.
struct RecordingApp {
    trace: Trace,
    fail_setup: bool,
}

impl RecordingApp {
    fn new(trace: &Trace) -> Self {
        Self { trace: trace.clone(), fail_setup: false }
    }

    fn failing(trace: &Trace) -> Self {
        Self { trace: trace.clone(), fail_setup: true }
    }
}

#[async_trait]
impl App for RecordingApp {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn setup(&mut self, system: &System) -> Result<()> {
        let ready = system.registry().ordered().iter().all(|driver| driver.is_initialized());
        self.trace.lock().unwrap().push(format!("setup (drivers ready: {})", ready));
        if self.fail_setup {
            return Err(Error::Other("setup refused".to_string()));
        }
        Ok(())
    }

    async fn start_loop(self, _system: System) -> Result<Termination> {
        self.trace.lock().unwrap().push("start_loop".to_string());
        Ok(Termination { code: 0 })
    }
}

/// Connector that never answers
struct PendingConnector;

#[async_trait]
impl Connector for PendingConnector {
    async fn connect_to_local(&self, _service: ServiceId) -> std::result::Result<Channel, IpcError> {
        std::future::pending().await
    }
}

fn local(server: &LocalServer) -> LocalConnector {
    LocalConnector::new().with_service(PRIMARY_LOCAL_SERVICE, server.clone())
}

async fn traced_events(trace: &Trace) -> Arc<EventManager> {
    let events = Arc::new(EventManager::new());
    let t = trace.clone();
    events
        .register_sync_type_handler::<SystemEvent, _>(move |event: &SystemEvent| {
            let line = match event {
                SystemEvent::PhaseEntered { phase } => format!("phase {}", phase),
                SystemEvent::DriverConstructed { driver } => format!("constructed {}", driver),
                SystemEvent::DriverInitialized { driver } => format!("initialized {}", driver),
                SystemEvent::LoopEntered => "loop entered".to_string(),
            };
            t.lock().unwrap().push(line);
            EventResult::Continue
        })
        .await;
    events
}

fn lifecycle_component(err: &Error) -> Option<String> {
    match err {
        Error::KernelLifecycleError { component_name, .. } => component_name.clone(),
        _ => None,
    }
}

#[test]
fn test_driver_order_is_gpio_timer_logging() {
    assert_eq!(DRIVER_ORDER, [Device::Gpio, Device::Timer, Device::Logging]);
}

#[test]
fn test_boot_phases_are_strictly_sequential() {
    let mut phase = BootPhase::Uninitialized;
    let mut seen = vec![phase];
    while let Some(next) = phase.next() {
        seen.push(next);
        phase = next;
    }
    assert_eq!(
        seen,
        vec![
            BootPhase::Uninitialized,
            BootPhase::ChannelReady,
            BootPhase::DriversConstructed,
            BootPhase::DriversInitialized,
            BootPhase::AppSetupDone,
            BootPhase::Running,
        ]
    );
}

#[tokio::test]
async fn test_fresh_boot_runs_every_step_in_order() {
    let trace: Trace = Arc::default();
    let server = LocalServer::builder().build();
    let bootstrap = Bootstrap::new(BootConfig::default(), local(&server)).with_events(traced_events(&trace).await);
    assert_eq!(bootstrap.phase(), BootPhase::Uninitialized);

    let termination = bootstrap.run(RecordingApp::new(&trace)).await.expect("boot should succeed");
    assert_eq!(termination, Termination { code: 0 });

    let trace = trace.lock().unwrap().clone();
    assert_eq!(
        trace,
        vec![
            "phase channel-ready",
            "constructed gpio",
            "constructed timer",
            "constructed logging",
            "phase drivers-constructed",
            "initialized gpio",
            "initialized timer",
            "initialized logging",
            "phase drivers-initialized",
            "setup (drivers ready: true)",
            "phase app-setup-done",
            "phase running",
            "start_loop",
        ]
    );
}

#[tokio::test]
async fn test_channel_precedes_any_driver_request() {
    let trace: Trace = Arc::default();
    let server = LocalServer::builder().build();
    Bootstrap::new(BootConfig::default(), local(&server))
        .run(RecordingApp::new(&trace))
        .await
        .expect("boot should succeed");

    let journal = server.journal();
    assert!(matches!(journal.first(), Some(JournalEntry::Accepted { .. })));
    assert_eq!(
        server.requests(),
        vec![
            Request::DeviceInit { device: Device::Gpio },
            Request::DeviceInit { device: Device::Timer },
            Request::DeviceInit { device: Device::Logging },
        ]
    );
    for device in DRIVER_ORDER {
        assert!(server.is_ready(device));
    }
}

#[tokio::test]
async fn test_unknown_service_is_fatal_before_drivers() {
    let trace: Trace = Arc::default();
    let server = LocalServer::builder().build();
    let mut config = BootConfig::default();
    config.server.service_id = 9;

    let err = Bootstrap::new(config, local(&server))
        .with_events(traced_events(&trace).await)
        .run(RecordingApp::new(&trace))
        .await
        .expect_err("boot must fail");

    assert_eq!(err.phase(), Some(&KernelLifecyclePhase::AcquireChannel));
    assert!(matches!(err.root(), Error::Ipc(IpcError::ServiceNotFound { service }) if *service == ServiceId(9)));
    assert!(trace.lock().unwrap().is_empty(), "no driver may be constructed and setup never runs");
    assert!(server.journal().is_empty());
}

#[tokio::test]
async fn test_refused_connection_is_fatal() {
    let trace: Trace = Arc::default();
    let server = LocalServer::builder().refuse_connections(true).build();

    let err = Bootstrap::new(BootConfig::default(), local(&server))
        .with_events(traced_events(&trace).await)
        .run(RecordingApp::new(&trace))
        .await
        .expect_err("boot must fail");

    assert_eq!(err.phase(), Some(&KernelLifecyclePhase::AcquireChannel));
    assert!(matches!(err.root(), Error::Ipc(IpcError::ConnectionRefused { .. })));
    assert!(trace.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_connect_timeout_is_a_channel_failure() {
    let trace: Trace = Arc::default();
    let mut config = BootConfig::default();
    config.server.connect_timeout_ms = 20;

    let err = Bootstrap::new(config, PendingConnector)
        .run(RecordingApp::new(&trace))
        .await
        .expect_err("boot must time out");

    assert_eq!(err.phase(), Some(&KernelLifecyclePhase::AcquireChannel));
    assert!(matches!(err.root(), Error::Ipc(IpcError::ConnectTimeout { timeout_ms: 20, .. })));
    assert!(trace.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_driver_init_failure_stops_the_sequence() {
    let trace: Trace = Arc::default();
    let server = LocalServer::builder().fail_device(Device::Timer).build();

    let err = Bootstrap::new(BootConfig::default(), local(&server))
        .with_events(traced_events(&trace).await)
        .run(RecordingApp::new(&trace))
        .await
        .expect_err("boot must fail");

    assert_eq!(err.phase(), Some(&KernelLifecyclePhase::InitDrivers));
    assert_eq!(lifecycle_component(&err).as_deref(), Some("timer"));

    let trace = trace.lock().unwrap().clone();
    assert!(trace.contains(&"initialized gpio".to_string()));
    assert!(!trace.iter().any(|line| line == "initialized timer" || line == "initialized logging"));
    assert!(!trace.iter().any(|line| line.starts_with("setup")));
    assert!(!server.requests().contains(&Request::DeviceInit { device: Device::Logging }));
}

#[tokio::test]
async fn test_setup_failure_never_reaches_the_loop() {
    let trace: Trace = Arc::default();
    let server = LocalServer::builder().build();

    let err = Bootstrap::new(BootConfig::default(), local(&server))
        .with_events(traced_events(&trace).await)
        .run(RecordingApp::failing(&trace))
        .await
        .expect_err("setup failure is fatal");

    assert_eq!(err.phase(), Some(&KernelLifecyclePhase::AppSetup));
    assert_eq!(lifecycle_component(&err).as_deref(), Some("recording"));
    let trace = trace.lock().unwrap().clone();
    assert_eq!(trace.last().map(String::as_str), Some("setup (drivers ready: true)"));
    assert!(!trace.contains(&"phase running".to_string()));
}

/// Arms a one-shot timer and exits with code 7 when it fires
struct ExitOnTimer;

#[async_trait]
impl App for ExitOnTimer {
    async fn setup(&mut self, system: &System) -> Result<()> {
        system.timer().set_timeout(10).await?;
        Ok(())
    }

    async fn on_event(&mut self, _system: &System, event: &DeviceEvent) -> Result<LoopControl> {
        match event {
            DeviceEvent::TimerExpired { periodic: false, .. } => Ok(LoopControl::Exit(7)),
            _ => Ok(LoopControl::Continue),
        }
    }
}

#[tokio::test]
async fn test_default_loop_returns_requested_termination() {
    let trace: Trace = Arc::default();
    let server = LocalServer::builder().build();

    let termination = Bootstrap::new(BootConfig::default(), local(&server))
        .with_events(traced_events(&trace).await)
        .run(ExitOnTimer)
        .await
        .expect("loop should terminate cleanly");

    assert_eq!(termination.code, 7);
    assert_eq!(trace.lock().unwrap().last().map(String::as_str), Some("loop entered"));
}

#[test]
fn test_report_includes_causes() {
    let err = Error::lifecycle(
        KernelLifecyclePhase::AcquireChannel,
        None,
        "cannot open a channel to service#9",
        IpcError::ServiceNotFound { service: ServiceId(9) },
    );
    let text = report(&err);
    assert!(text.starts_with("Kernel lifecycle error during AcquireChannel"));
    assert!(text.contains("service#9"));
}
