use std::time::Duration;

use crate::config::BootConfig;
use crate::drivers::{DriverError, TimerKind};
use crate::ipc::{LocalServer, Notification, TimerId};

use super::Rig;

async fn ready_rig(max_timers: usize) -> Rig {
    let mut config = BootConfig::default();
    config.timer.max_timers = max_timers;
    let rig = Rig::new(LocalServer::builder().build(), config);
    rig.init_all().await;
    rig
}

#[tokio::test]
async fn test_operations_require_initialization() {
    let rig = Rig::new(LocalServer::builder().build(), BootConfig::default());
    assert!(matches!(
        rig.timer().set_timeout(10).await,
        Err(DriverError::NotInitialized { driver: "timer" })
    ));
    assert!(matches!(rig.timer().uptime().await, Err(DriverError::NotInitialized { .. })));
}

#[tokio::test]
async fn test_zero_interval_is_rejected() {
    let rig = ready_rig(4).await;
    assert!(matches!(rig.timer().set_interval(0).await, Err(DriverError::InvalidInterval)));
    assert_eq!(rig.timer().active(), 0);
}

#[tokio::test]
async fn test_capacity_is_enforced() {
    let rig = ready_rig(2).await;
    let timer = rig.timer();

    let first = timer.set_interval(1_000).await.unwrap();
    let second = timer.set_timeout(1_000).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(timer.interval_ms(first), Some(1_000));

    assert!(matches!(timer.set_timeout(1_000).await, Err(DriverError::CapacityExceeded { max: 2 })));
    assert_eq!(rig.server.armed_timers(), 2);

    timer.cancel(first).await.unwrap();
    assert_eq!(timer.active(), 1);
    timer.set_timeout(1_000).await.unwrap();
}

#[tokio::test]
async fn test_cancel_unknown_timer() {
    let rig = ready_rig(4).await;
    assert!(matches!(
        rig.timer().cancel(TimerId(42)).await,
        Err(DriverError::UnknownTimer { timer: TimerId(42) })
    ));
}

#[tokio::test]
async fn test_one_shot_is_forgotten_after_expiry() {
    let rig = ready_rig(4).await;
    let timer = rig.timer();
    let mut notifications = rig.channel.take_notifications().unwrap();

    let once = timer.set_timeout(5).await.unwrap();
    let every = timer.set_interval(60_000).await.unwrap();

    let fired = tokio::time::timeout(Duration::from_secs(2), notifications.next()).await.unwrap().unwrap();
    assert_eq!(fired, Notification::TimerExpired { timer: once });

    assert_eq!(timer.acknowledge_expiry(once), Some(TimerKind::OneShot));
    assert_eq!(timer.acknowledge_expiry(once), None);
    assert_eq!(timer.acknowledge_expiry(every), Some(TimerKind::Periodic));
    assert_eq!(timer.active(), 1);
}

#[tokio::test]
async fn test_uptime_advances() {
    let rig = ready_rig(4).await;
    let first = rig.timer().uptime().await.unwrap();
    tokio::time::sleep(Duration::from_millis(15)).await;
    let second = rig.timer().uptime().await.unwrap();
    assert!(second > first);
}

#[tokio::test]
async fn test_cancel_after_one_shot_fired_forgets_it() {
    let rig = ready_rig(4).await;
    let timer = rig.timer();

    let once = timer.set_timeout(5).await.unwrap();
    // Fires on the server; the expiry is never acknowledged.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(rig.server.armed_timers(), 0);

    timer.cancel(once).await.unwrap();
    assert_eq!(timer.active(), 0);
    assert_eq!(timer.acknowledge_expiry(once), None);
    assert!(matches!(timer.cancel(once).await, Err(DriverError::UnknownTimer { .. })));
}

#[tokio::test]
async fn test_capacity_is_limited_by_the_server() {
    let rig = Rig::new(LocalServer::builder().timer_capacity(2).build(), BootConfig::default());
    rig.init_all().await;
    let timer = rig.timer();
    assert_eq!(timer.capacity(), Some(2));

    timer.set_interval(1_000).await.unwrap();
    timer.set_interval(1_000).await.unwrap();
    assert!(matches!(timer.set_interval(1_000).await, Err(DriverError::CapacityExceeded { max: 2 })));
    assert_eq!(rig.server.armed_timers(), 2);
}
