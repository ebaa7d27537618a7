use outpost_core::conf::OutpostConfig;
use outpost_core::connection::Network;
use std::path::Path;

/// Point every listener at a test-owned address: a free localhost port for
/// tcp, a socket inside `socket_dir` for unix.
pub(crate) fn patch_listeners(cfg: &mut OutpostConfig, tcp_port: u16, socket_dir: &Path) {
    let mut tcp_patched = false;

    for listener in &mut cfg.server.listeners {
        match listener.network {
            Network::Tcp => {
                assert!(!tcp_patched, "fixtures may declare at most one tcp listener");
                listener.address = format!("127.0.0.1:{tcp_port}");
                tcp_patched = true;
            }
            Network::Unix => {
                let file_name = Path::new(&listener.address)
                    .file_name()
                    .expect("unix listener address must name a file");
                listener.address = socket_dir.join(file_name).to_string_lossy().into_owned();
            }
        }
    }

    assert!(tcp_patched, "fixtures must declare a tcp listener");
}
