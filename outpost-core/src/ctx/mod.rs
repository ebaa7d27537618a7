mod request;
mod request_id;

pub use request::RequestCtx;
pub use request_id::RequestId;
