mod endpoint;
mod handlers;
mod response;
#[cfg(test)]
mod tests;

pub use endpoint::ApiEndpoint;
pub use handlers::*;
pub use response::ApiResponse;
