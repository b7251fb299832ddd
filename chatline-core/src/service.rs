//! Chat command layer
//!
//! Each command checks the users it names against the directory, applies
//! one store operation, then publishes the resulting alerts through the
//! fanout. Alerts are sent after the store lock is released.

use crate::config::Config;
use crate::conversation::{
    ConversationKind, ConversationSnapshot, ConversationStore, Standing, StoreError, StoreLimits,
};
use crate::identity::{IdentityDirectory, IdentityError, User};
use crate::metrics::Timer;
use crate::notify::{Alert, ChatCreated, Fanout, MemberChange, MessagePosted};
use crate::shutdown::ShutdownSignal;
use crate::stream::LiveStream;
use crate::types::{ConversationId, MemberId, MessageId, Timestamp, UserId};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

pub type ChatResult<T> = Result<T, ChatError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// A command named a user the directory does not know
    #[error("Unknown user: {0}")]
    UnknownUser(UserId),
}

/// Directory, store and fanout behind one command surface
#[derive(Clone)]
pub struct ChatService {
    directory: Arc<IdentityDirectory>,
    store: Arc<ConversationStore>,
    fanout: Arc<Fanout>,
}

impl ChatService {
    pub fn new(
        directory: Arc<IdentityDirectory>,
        store: Arc<ConversationStore>,
        fanout: Arc<Fanout>,
    ) -> Self {
        Self {
            directory,
            store,
            fanout,
        }
    }

    /// Build every component from configuration
    pub fn from_config(config: &Config) -> Result<Self, IdentityError> {
        let directory = Arc::new(IdentityDirectory::from_config(&config.directory)?);
        let store = Arc::new(ConversationStore::with_limits(StoreLimits::from(
            &config.limits,
        )));
        let fanout = Arc::new(Fanout::with_capacity(
            store.clone(),
            config.fanout.subscriber_buffer,
        ));
        Ok(Self::new(directory, store, fanout))
    }

    pub fn directory(&self) -> &Arc<IdentityDirectory> {
        &self.directory
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn fanout(&self) -> &Arc<Fanout> {
        &self.fanout
    }

    fn known(&self, user_id: &UserId) -> ChatResult<()> {
        if self.directory.contains(user_id) {
            Ok(())
        } else {
            Err(ChatError::UnknownUser(user_id.clone()))
        }
    }

    /// Verify credentials off the async runtime (argon2 is CPU bound)
    pub async fn authenticate(&self, username: &str, password: &str) -> ChatResult<UserId> {
        let directory = self.directory.clone();
        let username = username.to_string();
        let password = password.to_string();

        let user_id =
            tokio::task::spawn_blocking(move || directory.authenticate(&username, &password))
                .await
                .map_err(|e| IdentityError::Hashing(e.to_string()))??;
        Ok(user_id)
    }

    pub fn user(&self, user_id: &UserId) -> Option<User> {
        self.directory.user(user_id)
    }

    pub async fn create_direct(
        &self,
        owner: &UserId,
        title: &str,
        peer: &UserId,
    ) -> ChatResult<ConversationId> {
        let timer = Timer::new("create_direct");
        self.known(peer)?;

        let id = self.store.create_direct(title, owner, peer).await?;
        let alert = Alert::NewChatCreated(ChatCreated {
            chat_id: id.clone(),
            title: title.trim().to_string(),
            chat_type: ConversationKind::Direct,
            owner_id: owner.clone(),
            peer_user_id: Some(peer.clone()),
        });
        self.fanout.publish_to_conversation(&id, &alert).await;

        timer.stop();
        Ok(id)
    }

    pub async fn create_group(
        &self,
        owner: &UserId,
        title: &str,
        kind: ConversationKind,
    ) -> ChatResult<ConversationId> {
        let timer = Timer::new("create_group");

        let id = self.store.create_group(title, owner, kind).await?;
        let alert = Alert::NewChatCreated(ChatCreated {
            chat_id: id.clone(),
            title: title.trim().to_string(),
            chat_type: kind,
            owner_id: owner.clone(),
            peer_user_id: None,
        });
        self.fanout.publish_to_conversation(&id, &alert).await;

        timer.stop();
        Ok(id)
    }

    pub async fn post_message(
        &self,
        author: &UserId,
        id: &ConversationId,
        body: &str,
    ) -> ChatResult<(MessageId, Timestamp)> {
        let timer = Timer::new("post_message");

        let (message_id, created_at) = self.store.post_message(id, author, body).await?;
        let alert = Alert::NewMessageAdded(MessagePosted {
            chat_id: id.clone(),
            message_id: message_id.clone(),
            content: body.to_string(),
            owner_id: author.clone(),
            created_at,
        });
        self.fanout.publish_to_conversation(id, &alert).await;

        timer.stop();
        Ok((message_id, created_at))
    }

    pub async fn join(&self, user: &UserId, id: &ConversationId) -> ChatResult<MemberId> {
        let timer = Timer::new("join");

        let (member_id, standing) = self.store.join(id, user).await?;
        let alert = Alert::JoinedToChat(MemberChange {
            chat_id: id.clone(),
            member_id: member_id.clone(),
            user_id: user.clone(),
            member_status: standing,
            title: None,
        });
        self.fanout.publish_to_conversation(id, &alert).await;

        timer.stop();
        Ok(member_id)
    }

    /// Add `target`. The target is told first, then the conversation.
    pub async fn add_member(
        &self,
        acting: &UserId,
        id: &ConversationId,
        target: &UserId,
    ) -> ChatResult<MemberId> {
        let timer = Timer::new("add_member");
        self.known(target)?;

        let (title, member_id, standing) = self.store.add_member(id, acting, target).await?;

        // an existing inactive record stays as it was; nobody to announce
        if standing == Standing::Normal {
            let change = MemberChange {
                chat_id: id.clone(),
                member_id: member_id.clone(),
                user_id: target.clone(),
                member_status: standing,
                title: Some(title),
            };
            self.fanout
                .publish_to_user(target, &Alert::AddedToChat(change.clone()))
                .await;
            self.fanout
                .publish_to_conversation(id, &Alert::NewMemberAdded(change))
                .await;
        }

        timer.stop();
        Ok(member_id)
    }

    /// Leave. Remaining members are told first, then the leaver.
    pub async fn leave(&self, user: &UserId, id: &ConversationId) -> ChatResult<MemberId> {
        let timer = Timer::new("leave");

        let (left_user, member_id) = self.store.leave(id, user).await?;
        let change = MemberChange {
            chat_id: id.clone(),
            member_id: member_id.clone(),
            user_id: left_user.clone(),
            member_status: Standing::Left,
            title: None,
        };
        self.fanout
            .publish_to_conversation(id, &Alert::MemberLeftChat(change.clone()))
            .await;
        self.fanout
            .publish_to_user(&left_user, &Alert::LeftChat(change))
            .await;

        timer.stop();
        Ok(member_id)
    }

    /// Block the other side of a direct conversation
    pub async fn block_direct(
        &self,
        acting: &UserId,
        id: &ConversationId,
    ) -> ChatResult<(UserId, MemberId)> {
        let timer = Timer::new("block_direct");

        let (blocked, member_id) = self.store.block_direct(id, acting).await?;
        let alert = Alert::MemberBlocked(MemberChange {
            chat_id: id.clone(),
            member_id: member_id.clone(),
            user_id: blocked.clone(),
            member_status: Standing::Blocked,
            title: None,
        });
        self.fanout.publish_to_conversation(id, &alert).await;
        self.fanout.publish_to_user(&blocked, &alert).await;

        timer.stop();
        Ok((blocked, member_id))
    }

    /// Change a member's standing; the affected user is told even when the
    /// new standing hides the conversation from them.
    pub async fn set_member_standing(
        &self,
        acting: &UserId,
        id: &ConversationId,
        member_id: &MemberId,
        standing: Standing,
    ) -> ChatResult<UserId> {
        let timer = Timer::new("set_member_standing");

        let (affected, member_id) = self
            .store
            .set_member_standing(id, acting, member_id, standing)
            .await?;
        let alert = Alert::MemberStatusChanged(MemberChange {
            chat_id: id.clone(),
            member_id,
            user_id: affected.clone(),
            member_status: standing,
            title: None,
        });
        self.fanout.publish_to_conversation(id, &alert).await;
        if !standing.is_active() {
            self.fanout.publish_to_user(&affected, &alert).await;
        }

        timer.stop();
        Ok(affected)
    }

    pub async fn get_conversation(
        &self,
        viewer: &UserId,
        id: &ConversationId,
    ) -> ChatResult<ConversationSnapshot> {
        Ok(self.store.get_conversation(id, viewer).await?)
    }

    pub async fn list_conversations(&self, viewer: &UserId) -> Vec<ConversationSnapshot> {
        self.store.list_conversations(viewer).await
    }

    /// Subscribe a new live stream for `user`
    pub async fn open_stream(
        &self,
        user: &UserId,
        shutdown: broadcast::Receiver<ShutdownSignal>,
    ) -> LiveStream {
        LiveStream::open(self.fanout.clone(), user, shutdown).await
    }

    /// Close every live stream of `user` (used on logout)
    pub async fn close_streams(&self, user: &UserId) -> usize {
        self.fanout.drop_topic(user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DirectoryConfig, UserEntry};

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    fn service() -> ChatService {
        let users = ["a", "b", "c"]
            .iter()
            .map(|id| UserEntry {
                id: id.to_string(),
                username: format!("{id}@e.c"),
                first_name: id.to_uppercase(),
                last_name: String::new(),
                password: Some(id.to_string()),
                password_hash: None,
            })
            .collect();
        let config = Config {
            directory: DirectoryConfig {
                hash_memory_kib: 8,
                hash_iterations: 1,
                hash_parallelism: 1,
                users,
            },
            ..Config::default()
        };
        ChatService::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_authenticate() {
        let service = service();
        assert_eq!(service.authenticate("a@e.c", "a").await.unwrap(), user("a"));
        assert_eq!(
            service.authenticate("a@e.c", "b").await.unwrap_err(),
            ChatError::Identity(IdentityError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_unknown_peer_rejected() {
        let service = service();
        let err = service
            .create_direct(&user("a"), "Trip", &user("zed"))
            .await
            .unwrap_err();
        assert_eq!(err, ChatError::UnknownUser(user("zed")));
    }

    #[tokio::test]
    async fn test_create_notifies_both_participants() {
        let service = service();
        let mut a = service.fanout().subscribe(&user("a")).await;
        let mut b = service.fanout().subscribe(&user("b")).await;

        let id = service.create_direct(&user("a"), "Trip", &user("b")).await.unwrap();

        for handle in [&mut a, &mut b] {
            match handle.recv().await.unwrap() {
                Alert::NewChatCreated(created) => {
                    assert_eq!(created.chat_id, id);
                    assert_eq!(created.peer_user_id, Some(user("b")));
                }
                other => panic!("unexpected alert {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_add_member_alert_order() {
        let service = service();
        let id = service
            .create_group(&user("a"), "Team", ConversationKind::PublicGroup)
            .await
            .unwrap();
        let mut c = service.fanout().subscribe(&user("c")).await;

        service.add_member(&user("a"), &id, &user("c")).await.unwrap();

        let first = c.recv().await.unwrap();
        let second = c.recv().await.unwrap();
        assert_eq!(first.event_type(), "AddedToChat");
        assert_eq!(second.event_type(), "NewMemberAdded");
        match first {
            Alert::AddedToChat(change) => assert_eq!(change.title.as_deref(), Some("Team")),
            other => panic!("unexpected alert {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_leave_alert_order() {
        let service = service();
        let id = service.create_direct(&user("a"), "Trip", &user("b")).await.unwrap();
        let mut a = service.fanout().subscribe(&user("a")).await;
        let mut b = service.fanout().subscribe(&user("b")).await;

        service.leave(&user("a"), &id).await.unwrap();

        assert_eq!(b.recv().await.unwrap().event_type(), "MemberLeftChat");
        assert_eq!(a.recv().await.unwrap().event_type(), "LeftChat");
        assert!(a.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_blocked_user_is_told() {
        let service = service();
        let id = service.create_direct(&user("a"), "Trip", &user("b")).await.unwrap();
        let mut b = service.fanout().subscribe(&user("b")).await;

        let (blocked, _) = service.block_direct(&user("a"), &id).await.unwrap();
        assert_eq!(blocked, user("b"));
        assert_eq!(b.recv().await.unwrap().event_type(), "MemberBlocked");
        assert!(b.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_close_streams() {
        let service = service();
        let mut handle = service.fanout().subscribe(&user("a")).await;

        assert_eq!(service.close_streams(&user("a")).await, 1);
        assert!(handle.recv().await.is_none());
    }
}
