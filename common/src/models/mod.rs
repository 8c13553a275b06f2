//! Shared data models for the console services.

pub mod catalog;
pub mod result;
pub mod session;
pub mod view;

// Re-export commonly used types
pub use catalog::{CatalogEntry, CatalogItem, RunQueryRequest};
pub use result::{ResultModel, ScalarValue, TablePreview, PREVIEW_ROW_LIMIT};
pub use session::{ConnectRequest, Credentials, SessionStatus, SessionToken};
pub use view::{ConnectResponse, DebugReport, MessageResponse, ProbeOutcome, QueryView, TablesView};
