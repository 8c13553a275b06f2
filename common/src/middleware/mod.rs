//! Middleware and extractors shared by services.

pub mod request_id;
pub mod session;

pub use request_id::{request_id_middleware, RequestId, REQUEST_ID_HEADER};
pub use session::{SessionHeader, SESSION_COOKIE, SESSION_TOKEN_HEADER};
