//! Chatline core
//!
//! Conversation state machine, membership rules and per-user notification
//! fanout for a small multi-user chat service. The HTTP adapter lives in
//! `chatline-api` and only calls into the types re-exported here.

pub mod config;
pub mod conversation;
pub mod identity;
pub mod logging;
pub mod metrics;
pub mod notify;
pub mod service;
pub mod shutdown;
pub mod stream;
pub mod types;

pub use config::{Config, ConfigError};
pub use conversation::{
    ConversationKind, ConversationSnapshot, ConversationStore, MemberSnapshot, MessageSnapshot,
    Role, Standing, StoreError, StoreLimits, StoreResult,
};
pub use identity::{IdentityDirectory, IdentityError, User};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogLevel, LoggingError};
pub use notify::{Alert, Fanout, SubscriptionHandle};
pub use service::{ChatError, ChatResult, ChatService};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
pub use stream::{EventSink, LiveStream, StreamEnd, StreamFrame};
pub use types::{ConversationId, MemberId, MessageId, Timestamp, UserId};
