mod guard;
mod id;
mod metrics;
mod record;
mod registry;
#[cfg(test)]
mod tests;

pub use guard::ConnectionGuard;
pub use id::*;
pub use metrics::*;
pub use record::*;
pub use registry::*;
