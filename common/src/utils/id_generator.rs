//! Unique ID generator.

use uuid::Uuid;

/// Generates unique identifiers for various entities.
pub struct IdGenerator;

impl IdGenerator {
    /// Generates an unguessable session token.
    pub fn session_token() -> String {
        Uuid::new_v4().to_string()
    }

    /// Generates a unique request ID.
    pub fn request_id() -> String {
        Uuid::new_v4().to_string()
    }
}
