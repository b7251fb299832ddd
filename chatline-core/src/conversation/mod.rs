//! Conversations: kinds, membership rules and the store that owns them

pub mod error;
pub mod kind;
pub mod membership;
pub mod model;
pub mod snapshot;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use kind::{ConversationKind, ParseKindError};
pub use membership::{Member, ParseStandingError, Role, Standing};
pub use model::{Conversation, Message};
pub use snapshot::{ConversationSnapshot, MemberSnapshot, MessageSnapshot};
pub use store::{ConversationStore, StoreLimits};
