//! SQL identifier quoting.

/// Quotes a MySQL identifier with backticks, doubling embedded backticks.
///
/// Table names come from the engine's own listing, but may still contain
/// characters that are not valid in a bare identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
