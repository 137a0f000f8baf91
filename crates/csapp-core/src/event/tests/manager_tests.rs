use std::sync::{Arc, Mutex};

use crate::event::{DeviceEvent, Event, EventManager, EventResult, SystemEvent};
use crate::ipc::TimerId;

#[tokio::test]
async fn test_queue_is_processed_in_order() {
    let manager = EventManager::new();
    let names = Arc::new(Mutex::new(Vec::new()));

    let n = names.clone();
    manager
        .register_sync_type_handler::<DeviceEvent, _>(move |event: &DeviceEvent| {
            if let DeviceEvent::TimerExpired { timer, .. } = event {
                n.lock().unwrap().push(timer.0);
            }
            EventResult::Continue
        })
        .await;

    for timer in 1..=3 {
        manager.queue_event(Box::new(DeviceEvent::TimerExpired { timer: TimerId(timer), periodic: false }));
    }
    assert_eq!(manager.queue_size(), 3);
    assert!(names.lock().unwrap().is_empty());

    assert_eq!(manager.process_queue().await, 3);
    assert_eq!(manager.queue_size(), 0);
    assert_eq!(*names.lock().unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_handler_may_queue_follow_up_events() {
    let manager = Arc::new(EventManager::new());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let m = manager.clone();
    manager
        .register_sync_handler("app.loop_entered", move |_| {
            m.queue_event(Box::new(SystemEvent::DriverInitialized { driver: "gpio" }));
            EventResult::Continue
        })
        .await;
    let s = seen.clone();
    manager
        .register_sync_handler("boot.driver_initialized", move |event: &dyn Event| {
            s.lock().unwrap().push(event.name());
            EventResult::Continue
        })
        .await;

    manager.queue_event(Box::new(SystemEvent::LoopEntered));
    assert_eq!(manager.process_queue().await, 2);
    assert_eq!(*seen.lock().unwrap(), vec!["boot.driver_initialized"]);
}

#[tokio::test]
async fn test_unregister_through_manager() {
    let manager = EventManager::default();
    let id = manager.register_sync_handler("timer.expired", |_| EventResult::Stop).await;
    assert_eq!(manager.handler_count().await, 1);

    let event = DeviceEvent::TimerExpired { timer: TimerId(1), periodic: true };
    assert_eq!(manager.dispatch(&event).await, EventResult::Stop);

    assert!(manager.unregister_handler(id).await);
    assert_eq!(manager.dispatch(&event).await, EventResult::Continue);
}
