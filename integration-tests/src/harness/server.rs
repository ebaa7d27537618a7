use crate::harness::config::patch_listeners;
use crate::harness::{CapturedEvent, init_test_tracing};
use outpost_core::conf::load_config;
use outpost_core::server::{build_pingora_server, build_runtime_state};
use reqwest::blocking::{Client, RequestBuilder};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::runtime::Runtime;

/// Handle to a running Outpost test server.
///
/// Owns the control-plane runtime that hosts the metrics worker and the
/// directory holding the unix socket, so both live as long as the handle.
pub struct TestServer {
    base_url: String,
    api_context: String,
    socket_path: Option<PathBuf>,
    client: Client,
    _control_rt: Runtime,
    _socket_dir: TempDir,
}

impl TestServer {
    /// Start an Outpost instance from a TOML fixture under `fixtures/config`.
    ///
    /// Listener addresses are allocated per instance, so tests can run in parallel.
    pub fn start(fixture: &str) -> Self {
        // Initialize tracing (this must happen first).
        init_test_tracing(events());

        let fixture_path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join("config")
            .join(fixture);

        assert!(
            fixture_path.exists(),
            "fixture config does not exist: {:?}",
            fixture_path
        );

        let mut cfg = load_config(&fixture_path).expect("failed to load fixture config");

        let listen_port = free_port();
        let socket_dir = tempfile::tempdir().expect("failed to create socket dir");
        patch_listeners(&mut cfg, listen_port, socket_dir.path());

        let socket_path = cfg
            .server
            .listeners
            .iter()
            .find(|l| l.network == outpost_core::connection::Network::Unix)
            .map(|l| PathBuf::from(&l.address));

        let control_rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("failed to build control runtime");

        let state = build_runtime_state(&cfg, control_rt.handle());
        let server = build_pingora_server(&cfg, &state).expect("failed to build outpost server");

        // Run server in background thread
        thread::spawn(move || {
            server.run_forever();
        });

        let base_url = format!("http://127.0.0.1:{listen_port}");

        // Wait for server to accept connections
        wait_for_server(&base_url);

        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("failed to build client");

        Self {
            base_url,
            api_context: cfg.server.api_context.clone(),
            socket_path,
            client,
            _control_rt: control_rt,
            _socket_dir: socket_dir,
        }
    }

    /// GET an API route, `route` being relative to the api context.
    pub fn get(&self, route: &str) -> RequestBuilder {
        self.client.get(self.url(route))
    }

    pub fn post(&self, route: &str) -> RequestBuilder {
        self.client.post(self.url(route))
    }

    pub fn head(&self, route: &str) -> RequestBuilder {
        self.client.head(self.url(route))
    }

    pub fn url(&self, route: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_context, route)
    }

    /// GET a path outside the api context, e.g. a static file.
    pub fn get_path(&self, path: &str) -> RequestBuilder {
        self.client.get(format!("{}{}", self.base_url, path))
    }

    /// A client that speaks cleartext HTTP/2 without upgrade negotiation.
    pub fn h2c_client(&self) -> Client {
        Client::builder()
            .timeout(Duration::from_secs(5))
            .http2_prior_knowledge()
            .build()
            .expect("failed to build h2c client")
    }

    /// Send one raw `GET` over the unix listener and return the raw response.
    pub fn get_over_unix(&self, route: &str) -> String {
        let path = self
            .socket_path
            .as_ref()
            .expect("fixture has no unix listener");

        let mut stream = connect_unix(path);
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();

        write!(
            stream,
            "GET {}{} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            self.api_context, route
        )
        .unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    /// Every event captured so far, across all servers in this test binary.
    pub fn events(&self) -> Vec<CapturedEvent> {
        events().lock().unwrap().clone()
    }
}

/// Poll until the server accepts connections (or panic).
fn wait_for_server(listen_addr: &str) {
    let addr = listen_addr.strip_prefix("http://").unwrap_or(listen_addr);

    let deadline = Instant::now() + Duration::from_secs(2);

    loop {
        match TcpStream::connect(addr) {
            Ok(_) => return,
            Err(_) => {
                if Instant::now() > deadline {
                    panic!("server failed to start at {}", listen_addr);
                }
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

/// The unix listener binds alongside the tcp one, so give it the same grace period.
fn connect_unix(path: &Path) -> UnixStream {
    let deadline = Instant::now() + Duration::from_secs(2);

    loop {
        match UnixStream::connect(path) {
            Ok(stream) => return stream,
            Err(err) => {
                if Instant::now() > deadline {
                    panic!("unix listener {:?} not reachable: {err}", path);
                }
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

static EVENTS: OnceLock<Arc<Mutex<Vec<CapturedEvent>>>> = OnceLock::new();

fn events() -> Arc<Mutex<Vec<CapturedEvent>>> {
    EVENTS
        .get_or_init(|| Arc::new(Mutex::new(Vec::new())))
        .clone()
}

/// Allocate a free port on localhost.
/// This is required to avoid port collisions when running tests in parallel.
fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}
