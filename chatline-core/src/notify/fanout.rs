//! Per-user notification fanout
//!
//! Each user has one topic holding any number of bounded listeners.
//! Publishing never waits: a listener whose buffer is full is evicted
//! (removed from its topic, buffer closed after it drains).

use super::event::Alert;
use super::subscription::{SubscriberId, SubscriptionHandle};
use crate::conversation::ConversationStore;
use crate::metrics as metrics_names;
use crate::types::{ConversationId, UserId};
use metrics::{counter, gauge};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;

/// Default per-subscription buffer
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

struct Subscriber {
    id: SubscriberId,
    sender: mpsc::Sender<Alert>,
}

#[derive(Default)]
struct Topic {
    subscribers: Vec<Subscriber>,
}

impl Topic {
    /// Offer `alert` to every listener, pruning closed and full ones.
    /// Returns the number of successful deliveries.
    fn deliver(&mut self, user_id: &UserId, alert: &Alert) -> usize {
        let mut delivered = 0;

        self.subscribers
            .retain(|subscriber| match subscriber.sender.try_send(alert.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    counter!(metrics_names::SUBSCRIBERS_EVICTED).increment(1);
                    tracing::warn!(
                        user = %user_id,
                        subscriber = ?subscriber.id,
                        alert = alert.event_type(),
                        "Subscriber buffer full, evicting"
                    );
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(
                        user = %user_id,
                        subscriber = ?subscriber.id,
                        "Pruned closed subscriber"
                    );
                    false
                }
            });

        delivered
    }
}

/// Topic table keyed by user id
pub struct Fanout {
    store: Arc<ConversationStore>,
    topics: RwLock<HashMap<UserId, Topic>>,
    capacity: usize,
}

impl Fanout {
    pub fn new(store: Arc<ConversationStore>) -> Self {
        Self::with_capacity(store, DEFAULT_SUBSCRIBER_BUFFER)
    }

    /// `capacity` is the per-subscription buffer (at least 1)
    pub fn with_capacity(store: Arc<ConversationStore>, capacity: usize) -> Self {
        Self {
            store,
            topics: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn record_active(topics: &HashMap<UserId, Topic>) {
        let active: usize = topics.values().map(|t| t.subscribers.len()).sum();
        gauge!(metrics_names::SUBSCRIBERS_ACTIVE).set(active as f64);
    }

    /// Open a new listener on `user_id`'s topic. No backfill.
    pub async fn subscribe(&self, user_id: &UserId) -> SubscriptionHandle {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = SubscriberId::new();

        let mut topics = self.topics.write().await;
        let topic = topics.entry(user_id.clone()).or_default();
        topic.subscribers.push(Subscriber { id, sender });

        tracing::debug!(
            user = %user_id,
            subscriber = ?id,
            listeners = topic.subscribers.len(),
            "Subscribed"
        );
        Self::record_active(&topics);

        SubscriptionHandle {
            id,
            user_id: user_id.clone(),
            receiver,
        }
    }

    /// Detach and release a listener. Nothing is delivered to it afterwards.
    pub async fn unsubscribe(&self, handle: SubscriptionHandle) {
        let mut topics = self.topics.write().await;
        if let Some(topic) = topics.get_mut(&handle.user_id) {
            topic.subscribers.retain(|s| s.id != handle.id);
            tracing::debug!(
                user = %handle.user_id,
                subscriber = ?handle.id,
                remaining = topic.subscribers.len(),
                "Unsubscribed"
            );
        }
        Self::record_active(&topics);
    }

    /// Publish to one user's topic. Returns the number of deliveries.
    pub async fn publish_to_user(&self, user_id: &UserId, alert: &Alert) -> usize {
        counter!(metrics_names::ALERTS_PUBLISHED).increment(1);

        let mut topics = self.topics.write().await;
        let delivered = match topics.get_mut(user_id) {
            Some(topic) => topic.deliver(user_id, alert),
            None => 0,
        };
        Self::record_active(&topics);

        counter!(metrics_names::ALERTS_DELIVERED).increment(delivered as u64);
        delivered
    }

    /// Publish to every active member of a conversation.
    ///
    /// Unknown conversations and members without listeners are skipped.
    pub async fn publish_to_conversation(&self, id: &ConversationId, alert: &Alert) -> usize {
        counter!(metrics_names::ALERTS_PUBLISHED).increment(1);
        let recipients = self.store.active_members(id).await;

        let mut topics = self.topics.write().await;
        let mut delivered = 0;
        for user_id in &recipients {
            if let Some(topic) = topics.get_mut(user_id) {
                delivered += topic.deliver(user_id, alert);
            }
        }
        Self::record_active(&topics);

        tracing::debug!(
            conversation_id = %id,
            alert = alert.event_type(),
            recipients = recipients.len(),
            delivered,
            "Published to conversation"
        );
        counter!(metrics_names::ALERTS_DELIVERED).increment(delivered as u64);
        delivered
    }

    /// Remove a user's topic, closing every listener on it.
    /// Returns the number of listeners closed.
    pub async fn drop_topic(&self, user_id: &UserId) -> usize {
        let mut topics = self.topics.write().await;
        let closed = topics
            .remove(user_id)
            .map(|topic| topic.subscribers.len())
            .unwrap_or(0);
        Self::record_active(&topics);

        tracing::debug!(user = %user_id, closed, "Dropped topic");
        closed
    }

    /// Listeners currently attached to `user_id`'s topic
    pub async fn subscriber_count(&self, user_id: &UserId) -> usize {
        self.topics
            .read()
            .await
            .get(user_id)
            .map(|t| t.subscribers.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ConversationKind, Standing};
    use crate::notify::event::MemberChange;
    use crate::types::MemberId;

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    fn alert(n: usize) -> Alert {
        Alert::MemberStatusChanged(MemberChange {
            chat_id: ConversationId::new("c"),
            member_id: MemberId::new(format!("m{n}")),
            user_id: user("x"),
            member_status: Standing::Normal,
            title: None,
        })
    }

    fn fanout(capacity: usize) -> Fanout {
        Fanout::with_capacity(Arc::new(ConversationStore::new()), capacity)
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let fanout = fanout(4);
        assert_eq!(fanout.publish_to_user(&user("a"), &alert(0)).await, 0);
        assert_eq!(
            fanout
                .publish_to_conversation(&ConversationId::generate(), &alert(0))
                .await,
            0
        );
    }

    #[tokio::test]
    async fn test_every_listener_receives() {
        let fanout = fanout(4);
        let mut first = fanout.subscribe(&user("a")).await;
        let mut second = fanout.subscribe(&user("a")).await;

        assert_eq!(fanout.publish_to_user(&user("a"), &alert(1)).await, 2);
        assert_eq!(first.recv().await, Some(alert(1)));
        assert_eq!(second.recv().await, Some(alert(1)));
    }

    #[tokio::test]
    async fn test_no_backfill() {
        let fanout = fanout(4);
        fanout.publish_to_user(&user("a"), &alert(1)).await;

        let mut late = fanout.subscribe(&user("a")).await;
        assert!(late.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let fanout = fanout(4);
        let handle = fanout.subscribe(&user("a")).await;
        fanout.unsubscribe(handle).await;

        assert_eq!(fanout.subscriber_count(&user("a")).await, 0);
        assert_eq!(fanout.publish_to_user(&user("a"), &alert(1)).await, 0);
    }

    #[tokio::test]
    async fn test_dropped_handle_is_pruned() {
        let fanout = fanout(4);
        let handle = fanout.subscribe(&user("a")).await;
        drop(handle);

        assert_eq!(fanout.subscriber_count(&user("a")).await, 1);
        assert_eq!(fanout.publish_to_user(&user("a"), &alert(1)).await, 0);
        assert_eq!(fanout.subscriber_count(&user("a")).await, 0);
    }

    #[tokio::test]
    async fn test_full_subscriber_is_evicted_and_drains() {
        let fanout = fanout(2);
        let mut slow = fanout.subscribe(&user("a")).await;
        let mut healthy = fanout.subscribe(&user("a")).await;

        for n in 0..3 {
            fanout.publish_to_user(&user("a"), &alert(n)).await;
            // keep the healthy one drained
            assert_eq!(healthy.recv().await, Some(alert(n)));
        }

        assert_eq!(fanout.subscriber_count(&user("a")).await, 1);
        assert_eq!(slow.recv().await, Some(alert(0)));
        assert_eq!(slow.recv().await, Some(alert(1)));
        assert_eq!(slow.recv().await, None);

        assert_eq!(fanout.publish_to_user(&user("a"), &alert(9)).await, 1);
        assert_eq!(healthy.recv().await, Some(alert(9)));
    }

    #[tokio::test]
    async fn test_publish_to_conversation_reaches_active_members_only() {
        let store = Arc::new(ConversationStore::new());
        let fanout = Fanout::with_capacity(store.clone(), 8);
        let id = store
            .create_group("Team", &user("owner"), ConversationKind::PrivateGroup)
            .await
            .unwrap();
        store.join(&id, &user("pending")).await.unwrap();

        let mut owner = fanout.subscribe(&user("owner")).await;
        let mut pending = fanout.subscribe(&user("pending")).await;

        assert_eq!(fanout.publish_to_conversation(&id, &alert(1)).await, 1);
        assert_eq!(owner.recv().await, Some(alert(1)));
        assert!(pending.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_drop_topic_closes_listeners() {
        let fanout = fanout(4);
        let mut first = fanout.subscribe(&user("a")).await;
        let mut second = fanout.subscribe(&user("a")).await;
        let mut other = fanout.subscribe(&user("b")).await;

        fanout.publish_to_user(&user("a"), &alert(1)).await;
        assert_eq!(fanout.drop_topic(&user("a")).await, 2);

        assert_eq!(first.recv().await, Some(alert(1)));
        assert_eq!(first.recv().await, None);
        assert_eq!(second.recv().await, Some(alert(1)));
        assert_eq!(second.recv().await, None);

        assert_eq!(fanout.publish_to_user(&user("b"), &alert(2)).await, 1);
        assert_eq!(other.recv().await, Some(alert(2)));
    }
}
