use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn csapp() -> Command {
    let mut cmd = Command::cargo_bin("csapp").expect("binary is built");
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_ping_command() -> Result<(), Box<dyn std::error::Error>> {
    csapp()
        .arg("--ping")
        .assert()
        .success()
        .stdout(predicate::str::contains("pong"))
        .stdout(predicate::str::contains("blinky").not());
    Ok(())
}

#[test]
fn test_blinky_runs_to_completion() -> Result<(), Box<dyn std::error::Error>> {
    csapp()
        .args(["--interval-ms", "10", "--blinks", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("csapp INFO  blinky: ready, pin 13 every 10 ms"))
        .stdout(predicate::str::contains("blinky: pin 13 -> high"))
        .stdout(predicate::str::contains("blinky: pin 13 -> low"))
        .stdout(predicate::str::contains("blinky: done"));
    Ok(())
}

#[test]
fn test_unknown_service_is_fatal() -> Result<(), Box<dyn std::error::Error>> {
    csapp()
        .args(["--service-id", "9", "--interval-ms", "10", "--blinks", "1"])
        .assert()
        .code(70)
        .stderr(predicate::str::contains("fatal"))
        .stderr(predicate::str::contains("service#9"))
        .stdout(predicate::str::contains("blinky").not());
    Ok(())
}

#[test]
fn test_driver_failure_from_config_is_fatal() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("boot.json");
    std::fs::write(&path, r#"{ "simulator": { "failing_devices": ["timer"] } }"#)?;

    csapp()
        .arg("--config")
        .arg(&path)
        .assert()
        .code(70)
        .stderr(predicate::str::contains("InitDrivers"))
        .stdout(predicate::str::contains("blinky").not());
    Ok(())
}

#[test]
fn test_invalid_pin_fails_setup() -> Result<(), Box<dyn std::error::Error>> {
    csapp()
        .args(["--led-pin", "40", "--blinks", "1"])
        .assert()
        .code(70)
        .stderr(predicate::str::contains("AppSetup"));
    Ok(())
}

#[test]
fn test_unreadable_config_is_fatal() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("boot.json");
    std::fs::write(&path, "{ not json")?;

    csapp()
        .arg("--config")
        .arg(&path)
        .assert()
        .code(70)
        .stderr(predicate::str::contains("fatal"));
    Ok(())
}

#[test]
fn test_zero_blinks_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    csapp().args(["--blinks", "0"]).assert().failure().code(2);
    Ok(())
}
