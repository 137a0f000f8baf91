use std::sync::Arc;

use log::LevelFilter;

use crate::config::{BootConfig, LoggingConfig};
use crate::drivers::{DriverError, LoggingDriver};
use crate::ipc::{LocalServer, PRIMARY_LOCAL_SERVICE};
use crate::kernel::component::{Driver, DriverContext, DriverRegistry};

use super::Rig;

#[tokio::test]
async fn test_logging_requires_initialization() {
    let rig = Rig::new(LocalServer::builder().build(), BootConfig::default());
    assert!(matches!(
        rig.logging().info("too early").await,
        Err(DriverError::NotInitialized { driver: "logging" })
    ));
}

#[tokio::test]
async fn test_lines_carry_prefix_level_and_uptime() {
    let rig = Rig::new(LocalServer::builder().build(), BootConfig::default());
    rig.init_all().await;

    rig.logging().info("hello").await.unwrap();

    let console = rig.server.console();
    assert_eq!(console.len(), 1);
    assert!(console[0].starts_with('['), "missing uptime stamp: {}", console[0]);
    assert!(console[0].ends_with("] csapp INFO  hello"), "unexpected line: {}", console[0]);
}

#[tokio::test]
async fn test_lines_below_level_are_dropped() {
    let mut config = BootConfig::default();
    config.logging.level = "warn".to_string();
    let rig = Rig::new(LocalServer::builder().build(), config);
    rig.init_all().await;

    let logging = rig.logging();
    assert_eq!(logging.level(), LevelFilter::Warn);
    logging.info("quiet").await.unwrap();
    logging.debug("quieter").await.unwrap();
    logging.error("loud").await.unwrap();

    let console = rig.server.console();
    assert_eq!(console.len(), 1);
    assert!(console[0].ends_with("csapp ERROR loud"));
}

#[tokio::test]
async fn test_without_timer_lines_have_no_stamp() {
    let server = LocalServer::builder().build();
    let channel = Arc::new(server.accept(PRIMARY_LOCAL_SERVICE).unwrap());
    let config = BootConfig {
        logging: LoggingConfig { prefix: "node".to_string(), level: "debug".to_string() },
        ..BootConfig::default()
    };
    let mut registry = DriverRegistry::new();
    registry.register_instance(Arc::new(LoggingDriver::new(&config.logging))).unwrap();

    let logging: Arc<LoggingDriver> = registry.get_concrete().unwrap();
    let ctx = DriverContext { channel: &channel, config: &config, registry: &registry };
    logging.initialize(&ctx).await.unwrap();
    logging.warn("careful").await.unwrap();

    assert_eq!(server.console(), vec!["node WARN  careful".to_string()]);
}

#[test]
fn test_unknown_level_falls_back_to_info() {
    let driver = LoggingDriver::new(&LoggingConfig { prefix: "x".to_string(), level: "loudest".to_string() });
    assert_eq!(driver.level(), LevelFilter::Info);
}
