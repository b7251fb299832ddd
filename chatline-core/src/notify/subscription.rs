//! Subscription handles

use super::event::Alert;
use crate::types::UserId;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifies one listener on a user's topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of one subscription.
///
/// Hand it back to [`Fanout::unsubscribe`](super::Fanout::unsubscribe) to
/// detach. Dropping it also works: the dead listener is pruned on the next
/// publish to the topic.
#[derive(Debug)]
pub struct SubscriptionHandle {
    pub(super) id: SubscriberId,
    pub(super) user_id: UserId,
    pub(super) receiver: mpsc::Receiver<Alert>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Next alert. `None` once the subscription was evicted or its topic
    /// dropped and everything already queued has been drained.
    pub async fn recv(&mut self) -> Option<Alert> {
        self.receiver.recv().await
    }

    /// Next queued alert without waiting
    pub fn try_recv(&mut self) -> Option<Alert> {
        self.receiver.try_recv().ok()
    }
}
