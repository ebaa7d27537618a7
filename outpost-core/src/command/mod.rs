mod catalog;
mod error;
mod gate;
mod runner;
mod service;

pub use catalog::*;
pub use error::*;
pub use gate::*;
pub use runner::*;
pub use service::*;
