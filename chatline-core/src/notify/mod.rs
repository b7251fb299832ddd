//! Notification fanout: alerts, per-user topics and subscriptions

pub mod event;
pub mod fanout;
pub mod subscription;

pub use event::{Alert, ChatCreated, MemberChange, MessagePosted};
pub use fanout::{Fanout, DEFAULT_SUBSCRIBER_BUFFER};
pub use subscription::{SubscriberId, SubscriptionHandle};
