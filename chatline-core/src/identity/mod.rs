//! Identity directory: username/password to stable user ids

mod directory;
mod error;

pub use directory::{IdentityDirectory, User};
pub use error::IdentityError;
