mod app;

use std::path::PathBuf;
use std::process;

use clap::Parser;
use csapp_core::kernel::constants::FATAL_EXIT_CODE;
use csapp_core::{BootConfig, LocalConnector, LocalServer, PRIMARY_LOCAL_SERVICE};

use crate::app::Blinky;

/// csapp: boots an application on top of the local system server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Print "pong" and exit without booting
    #[arg(long)]
    ping: bool,

    /// Boot configuration file (.json, .toml, .yaml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Connect to this service instead of the configured one
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    service_id: Option<u32>,

    /// Output pin driving the LED
    #[arg(long, default_value_t = 13)]
    led_pin: u8,

    /// Milliseconds between LED toggles
    #[arg(long, default_value_t = 250, value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: u64,

    /// Number of on/off cycles before exiting
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    blinks: u32,
}

fn main() {
    let args = CliArgs::parse();

    if args.ping {
        println!("pong");
        return;
    }

    if let Err(e) = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).try_init() {
        eprintln!("warning: logger already initialized: {}", e);
    }

    let mut config = match &args.config {
        Some(path) => match BootConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Cannot load {}: {}", path.display(), e);
                eprintln!("fatal: {}", e);
                process::exit(FATAL_EXIT_CODE);
            }
        },
        None => BootConfig::default(),
    };
    if let Some(service_id) = args.service_id {
        config.server.service_id = service_id;
    }

    // The in-process server only answers as the primary local service.
    let server = LocalServer::from_config(&config);
    let connector = LocalConnector::new().with_service(PRIMARY_LOCAL_SERVICE, server);

    let app = Blinky::new(args.led_pin, args.interval_ms, args.blinks);
    csapp_core::startup(config, connector, app)
}
