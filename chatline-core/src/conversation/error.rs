//! Conversation store errors

use super::membership::Standing;
use thiserror::Error;

/// Result type for conversation store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by the conversation store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Conversation lookup miss
    #[error("Conversation not found")]
    NotFound,

    /// A direct conversation between the same pair already exists
    #[error("Direct conversation already exists")]
    DuplicateConversation,

    /// Caller has no active membership in the conversation
    #[error("User is not a member of the conversation")]
    NotAMember,

    /// Member record lookup miss
    #[error("Member not found in conversation")]
    NoSuchMember,

    /// Operation only valid for direct conversations
    #[error("Conversation is not a direct conversation")]
    NotDirect,

    /// Operation only valid for group or channel conversations
    #[error("Conversation is not a group or channel")]
    NotGroup,

    /// Caller lacks the required role or standing
    #[error("Permission denied")]
    Forbidden,

    /// Requested standing change is not allowed
    #[error("Cannot change member status from {from} to {to}")]
    InvalidTransition { from: Standing, to: Standing },

    /// Rejected input (title, message body, participants)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
