use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn write_config(dir: &Path, port: u16) -> std::path::PathBuf {
    let path = dir.join("outpost.toml");
    let raw = format!(
        r#"
[server]
keepalive_seconds = 5

[[server.listeners]]
network = "tcp"
address = "127.0.0.1:{port}"

[commands]
max_concurrent = 1
acquire_timeout_ms = 100
execution_timeout_ms = 1000

[logging]
access_log_dir = "{logs}"
"#,
        logs = dir.join("logs").display()
    );
    fs::write(&path, raw).unwrap();
    path
}

fn connect(port: u16) -> TcpStream {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match TcpStream::connect(("127.0.0.1", port)) {
            Ok(stream) => return stream,
            Err(err) if Instant::now() > deadline => panic!("outpost did not start: {err}"),
            Err(_) => thread::sleep(Duration::from_millis(25)),
        }
    }
}

fn wait_for_exit(child: &mut Child) -> std::process::ExitStatus {
    let deadline = Instant::now() + Duration::from_secs(15);
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("outpost did not exit after SIGINT");
        }
        thread::sleep(Duration::from_millis(50));
    }
}

#[test]
fn sigint_returns_through_main_and_flushes_access_log() {
    let dir = tempfile::tempdir().unwrap();
    let port = free_port();
    let config = write_config(dir.path(), port);

    let mut child = Command::new(env!("CARGO_BIN_EXE_outpost"))
        .arg("run")
        .arg("--config")
        .arg(&config)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let mut stream = connect(port);
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    write!(
        stream,
        "GET /api/v1/health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
    )
    .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");

    // Listeners come up before the signal handlers are installed.
    thread::sleep(Duration::from_millis(300));

    let killed = Command::new("kill")
        .arg("-INT")
        .arg(child.id().to_string())
        .status()
        .unwrap();
    assert!(killed.success());

    let status = wait_for_exit(&mut child);
    assert!(status.success(), "outpost exited with {status}");

    let mut stdout = String::new();
    child
        .stdout
        .take()
        .unwrap()
        .read_to_string(&mut stdout)
        .unwrap();
    assert!(
        stdout.contains("outpost stopped"),
        "server did not return from its run loop:\n{stdout}"
    );

    let access_log: String = fs::read_dir(dir.path().join("logs"))
        .unwrap()
        .map(|entry| fs::read_to_string(entry.unwrap().path()).unwrap())
        .collect();
    assert!(
        access_log.contains("/api/v1/health"),
        "access log is missing the request: {access_log:?}"
    );
}
