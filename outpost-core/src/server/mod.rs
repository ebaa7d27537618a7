mod app;
mod runtime;
pub mod setup;

pub use app::TrackedHttpApp;
pub use runtime::{RuntimeState, build_runtime_state};
pub use setup::{build_pingora_server, run};
