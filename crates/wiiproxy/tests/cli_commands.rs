#![cfg(feature = "cli")]

use std::process::{Command, Output};

fn wiiproxy(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wiiproxy"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .env_remove("WIIPROXY_PORT")
        .output()
        .expect("wiiproxy should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn encode_get_request() {
    let output = wiiproxy(&["--format", "json", "encode", "attitude"]);
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("\"hex\":\"244d3e006c6c\""), "{stdout}");
    assert!(stdout.contains("\"name\":\"ATTITUDE\""));
}

#[test]
fn encode_reply_with_negative_values() {
    let output = wiiproxy(&[
        "--format", "pretty", "encode", "--reply", "108", "10", "-20", "180",
    ]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "244d3c066c0a00ecffb400c7");
}

#[test]
fn encode_get_with_values_is_usage_error() {
    let output = wiiproxy(&["encode", "attitude", "1", "2", "3"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn decode_reply() {
    let output = wiiproxy(&["--format", "json", "decode", "244d3c066c0a00ecffb400c7"]);
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("\"values\":[10,-20,180]"), "{stdout}");
    assert!(stdout.contains("\"code\":108"));
}

#[test]
fn decode_bad_checksum_is_data_invalid() {
    let output = wiiproxy(&["decode", "244d3c066c0a00ecffb400c8"]);
    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("checksum"));
}

#[test]
fn decode_invalid_hex_is_usage_error() {
    let output = wiiproxy(&["decode", "24zz"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn commands_lists_catalog() {
    let output = wiiproxy(&["--format", "json", "commands"]);
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("\"name\":\"ATTITUDE\""));
    assert!(stdout.contains("\"layout\":\"3h\""));
    assert!(stdout.contains("\"kind\":\"set\""));
}

#[test]
fn get_on_missing_port_is_transport_error() {
    let output = wiiproxy(&["get", "attitude", "--port", "/nonexistent/wiiproxy-tty"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("open failed"));
}

#[test]
fn get_of_set_command_is_usage_error() {
    let output = wiiproxy(&["get", "set_head", "--port", "/nonexistent/wiiproxy-tty"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn set_with_bad_values_fails_before_opening_port() {
    let output = wiiproxy(&["set", "set_head", "1", "2", "--port", "/nonexistent/wiiproxy-tty"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn version_prints_package_version() {
    let output = wiiproxy(&["version"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output).trim(),
        format!("wiiproxy {}", env!("CARGO_PKG_VERSION"))
    );
}
