//! Identity directory errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Unknown username or wrong password. The two are never told apart.
    #[error("Invalid username or password")]
    NotFound,

    /// A directory entry could not be loaded
    #[error("Invalid directory entry: {0}")]
    InvalidEntry(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}
