// error.rs — Error types for role resolution.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    /// A role name from config or the wire did not match any known role.
    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// A caller was resolved with an empty identity token.
    #[error("caller identity must not be empty")]
    EmptyIdentity,
}
