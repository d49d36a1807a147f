#![cfg(unix)]

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

fn unique_temp_config(tag: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "portbridge-{tag}-{}-{}.json",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::write(&path, contents).expect("config file should be writable");
    path
}

fn frame(payload: &[u8]) -> Vec<u8> {
    let mut wire = (payload.len() as u32).to_ne_bytes().to_vec();
    wire.extend_from_slice(payload);
    wire
}

fn read_frame(reader: &mut impl Read) -> Vec<u8> {
    let mut header = [0u8; 4];
    reader.read_exact(&mut header).expect("length header");
    let len = u32::from_ne_bytes(header) as usize;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).expect("payload");
    payload
}

#[test]
fn version_request_round_trips_and_eof_ends_host() {
    let config = unique_temp_config("version", r#"{"serial_ports":[]}"#);

    let mut child = Command::new(env!("CARGO_BIN_EXE_portbridge"))
        .arg("--config")
        .arg(&config)
        .arg("--log-level")
        .arg("error")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("host should start");

    let mut stdin = child.stdin.take().expect("stdin pipe");
    let mut stdout = child.stdout.take().expect("stdout pipe");

    stdin
        .write_all(&frame(b"[\"1\",[\"version\"]]"))
        .expect("request should send");
    let reply = read_frame(&mut stdout);
    assert_eq!(reply, b"[\"@\",\"1\",[\"0.1\"]]");

    drop(stdin);
    let status = child.wait().expect("host should exit");
    assert!(status.success());

    let _ = std::fs::remove_file(&config);
}

#[test]
fn serial_list_reflects_config() {
    let config = unique_temp_config(
        "list",
        r#"{"serial_ports":["/dev/ttyS0","/dev/ttyUSB0"]}"#,
    );

    let mut child = Command::new(env!("CARGO_BIN_EXE_portbridge"))
        .arg("--config")
        .arg(&config)
        .arg("--log-level")
        .arg("error")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("host should start");

    let mut stdin = child.stdin.take().expect("stdin pipe");
    let mut stdout = child.stdout.take().expect("stdout pipe");

    stdin
        .write_all(&frame(b"[\"7\",[\"serial_list\"]]"))
        .expect("request should send");
    let reply = read_frame(&mut stdout);
    assert_eq!(reply, b"[\"@\",\"7\",[\"/dev/ttyS0\",\"/dev/ttyUSB0\"]]");

    drop(stdin);
    assert!(child.wait().expect("host should exit").success());
    let _ = std::fs::remove_file(&config);
}

#[test]
fn missing_config_fails_startup() {
    let status = Command::new(env!("CARGO_BIN_EXE_portbridge"))
        .arg("--config")
        .arg("/nonexistent/portbridge.json")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("host should run");
    assert!(!status.success());
}

#[test]
fn unknown_command_is_dropped_and_session_continues() {
    let config = unique_temp_config("unknown", r#"{"serial_ports":[]}"#);

    let mut child = Command::new(env!("CARGO_BIN_EXE_portbridge"))
        .arg("--config")
        .arg(&config)
        .arg("--log-level")
        .arg("error")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("host should start");

    let mut stdin = child.stdin.take().expect("stdin pipe");
    let mut stdout = child.stdout.take().expect("stdout pipe");

    let mut wire = frame(b"[\"1\",[\"bogus_command\"]]");
    wire.extend_from_slice(&frame(b"[\"2\",[\"version\"]]"));
    stdin.write_all(&wire).expect("requests should send");

    // The only frame back is the version reply.
    let reply = read_frame(&mut stdout);
    assert_eq!(reply, b"[\"@\",\"2\",[\"0.1\"]]");

    drop(stdin);
    assert!(child.wait().expect("host should exit").success());
    let _ = std::fs::remove_file(&config);
}
