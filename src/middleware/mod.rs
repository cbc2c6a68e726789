pub mod request_context;

pub use request_context::{make_request_span, request_context_middleware, RequestContext};
