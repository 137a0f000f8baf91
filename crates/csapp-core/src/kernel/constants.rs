/// Application name
pub const APP_NAME: &str = "csapp";

/// Application version
pub const APP_VERSION: &str = "0.1.0";

/// Well-known id of the primary local service
pub const PRIMARY_LOCAL_SERVICE_ID: u32 = 1;

/// Default bound on channel acquisition
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1000;

/// Default number of GPIO pins
pub const DEFAULT_PIN_COUNT: u8 = 32;

/// Default number of concurrently armed timers
pub const DEFAULT_MAX_TIMERS: usize = 16;

/// Default console tag
pub const DEFAULT_LOG_PREFIX: &str = "csapp";

/// Default console level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Process exit status after a fatal bootstrap failure (EX_SOFTWARE)
pub const FATAL_EXIT_CODE: i32 = 70;
