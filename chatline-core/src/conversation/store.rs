//! In-memory conversation store
//!
//! Every operation takes the table lock once, so it is atomic with respect
//! to the conversation it touches. Only snapshots leave the store.

use super::error::{StoreError, StoreResult};
use super::kind::ConversationKind;
use super::membership::{Member, Role, Standing};
use super::model::Conversation;
use super::snapshot::ConversationSnapshot;
use crate::metrics as metrics_names;
use crate::types::{ConversationId, MemberId, MessageId, Timestamp, UserId};
use chrono::Utc;
use metrics::counter;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Input limits applied by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    /// Maximum title length in characters
    pub max_title_len: usize,

    /// Maximum message body length in characters
    pub max_message_len: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_title_len: 100,
            max_message_len: 4096,
        }
    }
}

#[derive(Debug, Default)]
struct Table {
    /// Conversation id -> position in `conversations`
    index: HashMap<ConversationId, usize>,

    /// Conversations in creation order
    conversations: Vec<Conversation>,
}

impl Table {
    fn get(&self, id: &ConversationId) -> StoreResult<&Conversation> {
        self.index
            .get(id)
            .map(|&pos| &self.conversations[pos])
            .ok_or(StoreError::NotFound)
    }

    fn get_mut(&mut self, id: &ConversationId) -> StoreResult<&mut Conversation> {
        match self.index.get(id) {
            Some(&pos) => Ok(&mut self.conversations[pos]),
            None => Err(StoreError::NotFound),
        }
    }

    fn insert(&mut self, conversation: Conversation) -> ConversationId {
        let id = conversation.id.clone();
        self.index.insert(id.clone(), self.conversations.len());
        self.conversations.push(conversation);
        id
    }
}

/// Owner of all conversations
#[derive(Debug, Default)]
pub struct ConversationStore {
    table: RwLock<Table>,
    limits: StoreLimits,
}

impl ConversationStore {
    /// Create an empty store with default limits
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: StoreLimits) -> Self {
        Self {
            table: RwLock::new(Table::default()),
            limits,
        }
    }

    pub fn limits(&self) -> StoreLimits {
        self.limits
    }

    fn check_title(&self, title: &str) -> StoreResult<String> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(StoreError::InvalidInput("title must not be empty".into()));
        }
        if trimmed.chars().count() > self.limits.max_title_len {
            return Err(StoreError::InvalidInput(format!(
                "title exceeds {} characters",
                self.limits.max_title_len
            )));
        }
        Ok(trimmed.to_string())
    }

    fn check_body(&self, body: &str) -> StoreResult<()> {
        if body.trim().is_empty() {
            return Err(StoreError::InvalidInput("message must not be empty".into()));
        }
        if body.chars().count() > self.limits.max_message_len {
            return Err(StoreError::InvalidInput(format!(
                "message exceeds {} characters",
                self.limits.max_message_len
            )));
        }
        Ok(())
    }

    /// Create a direct conversation between `owner` and `peer`.
    ///
    /// At most one direct conversation exists per unordered pair.
    pub async fn create_direct(
        &self,
        title: &str,
        owner: &UserId,
        peer: &UserId,
    ) -> StoreResult<ConversationId> {
        let title = self.check_title(title)?;
        if owner == peer {
            return Err(StoreError::InvalidInput(
                "direct conversation needs two distinct users".into(),
            ));
        }

        let mut table = self.table.write().await;
        if table
            .conversations
            .iter()
            .any(|c| c.is_direct_between(owner, peer))
        {
            return Err(StoreError::DuplicateConversation);
        }

        let conversation = Conversation::direct(title, owner.clone(), peer.clone(), Utc::now());
        let id = table.insert(conversation);
        counter!(metrics_names::CONVERSATIONS_CREATED).increment(1);

        tracing::info!(
            conversation_id = %id,
            owner = %owner,
            peer = %peer,
            "Created direct conversation"
        );

        Ok(id)
    }

    /// Create a group or channel owned by `owner`
    pub async fn create_group(
        &self,
        title: &str,
        owner: &UserId,
        kind: ConversationKind,
    ) -> StoreResult<ConversationId> {
        if kind.is_direct() {
            return Err(StoreError::NotGroup);
        }
        let title = self.check_title(title)?;

        let conversation = Conversation::group(title, owner.clone(), kind, Utc::now());
        let id = self.table.write().await.insert(conversation);
        counter!(metrics_names::CONVERSATIONS_CREATED).increment(1);

        tracing::info!(
            conversation_id = %id,
            owner = %owner,
            kind = %kind,
            "Created group conversation"
        );

        Ok(id)
    }

    /// Append a message authored by an active member
    pub async fn post_message(
        &self,
        id: &ConversationId,
        author: &UserId,
        body: &str,
    ) -> StoreResult<(MessageId, Timestamp)> {
        self.check_body(body)?;

        let mut table = self.table.write().await;
        let conversation = table.get_mut(id)?;
        if !conversation.is_active_member(author) {
            return Err(StoreError::NotAMember);
        }

        let message = conversation.append_message(author.clone(), body.to_string(), Utc::now());
        let result = (message.id.clone(), message.created_at);
        counter!(metrics_names::MESSAGES_POSTED).increment(1);

        tracing::debug!(
            conversation_id = %id,
            author = %author,
            message_id = %result.0,
            "Posted message"
        );

        Ok(result)
    }

    /// Join a group or channel.
    ///
    /// Private kinds land in `Requested`. A `Left` record is reactivated;
    /// a `Normal` or `Requested` record is returned unchanged. Returns the
    /// member id and the resulting standing.
    pub async fn join(
        &self,
        id: &ConversationId,
        user: &UserId,
    ) -> StoreResult<(MemberId, Standing)> {
        let mut table = self.table.write().await;
        let conversation = table.get_mut(id)?;
        if conversation.kind.is_direct() {
            return Err(StoreError::NotGroup);
        }

        let entry_standing = if conversation.kind.requires_admission() {
            Standing::Requested
        } else {
            Standing::Normal
        };
        let now = Utc::now();

        if let Some(member) = conversation.member_for_mut(user) {
            return match member.standing {
                Standing::Normal | Standing::Requested => {
                    Ok((member.id.clone(), member.standing))
                }
                Standing::Left => {
                    member.standing = entry_standing;
                    member.joined_at = now;
                    tracing::info!(
                        conversation_id = %id,
                        user = %user,
                        standing = %entry_standing,
                        "Member rejoined conversation"
                    );
                    Ok((member.id.clone(), entry_standing))
                }
                Standing::Blocked | Standing::Expelled => Err(StoreError::Forbidden),
            };
        }

        let (member_id, _) =
            conversation.add_member(Member::new(user.clone(), Role::Normal, entry_standing, now));

        tracing::info!(
            conversation_id = %id,
            user = %user,
            member_id = %member_id,
            standing = %entry_standing,
            "Joined conversation"
        );

        Ok((member_id, entry_standing))
    }

    /// Add `target` to a group or channel on behalf of an owner/admin.
    ///
    /// Returns the conversation title, the target's member id and its
    /// standing. If the target already has a record it is returned untouched.
    pub async fn add_member(
        &self,
        id: &ConversationId,
        acting: &UserId,
        target: &UserId,
    ) -> StoreResult<(String, MemberId, Standing)> {
        let mut table = self.table.write().await;
        let conversation = table.get_mut(id)?;
        if conversation.kind.is_direct() {
            return Err(StoreError::NotGroup);
        }
        if !conversation.member_for(acting).map(Member::is_manager).unwrap_or(false) {
            return Err(StoreError::Forbidden);
        }

        let (member_id, added) = conversation.add_member(Member::new(
            target.clone(),
            Role::Normal,
            Standing::Normal,
            Utc::now(),
        ));

        if added {
            tracing::info!(
                conversation_id = %id,
                acting = %acting,
                target = %target,
                member_id = %member_id,
                "Added member to conversation"
            );
        } else {
            tracing::debug!(
                conversation_id = %id,
                target = %target,
                "Member already present, add is a no-op"
            );
        }

        let standing = conversation
            .member_for(target)
            .map(|m| m.standing)
            .unwrap_or(Standing::Normal);

        Ok((conversation.title.clone(), member_id, standing))
    }

    /// Mark `user`'s record as left.
    ///
    /// Blocked and expelled records keep their standing (`Forbidden`), so a
    /// later `join` cannot lift them. The owner of a group or channel cannot
    /// leave it.
    pub async fn leave(&self, id: &ConversationId, user: &UserId) -> StoreResult<(UserId, MemberId)> {
        let mut table = self.table.write().await;
        let conversation = table.get_mut(id)?;
        let is_group = conversation.kind.is_group();
        let member = conversation
            .member_for_mut(user)
            .ok_or(StoreError::NoSuchMember)?;

        if matches!(member.standing, Standing::Blocked | Standing::Expelled) {
            return Err(StoreError::Forbidden);
        }
        if is_group && member.role == Role::Owner {
            return Err(StoreError::Forbidden);
        }

        member.standing = Standing::Left;
        let member_id = member.id.clone();

        tracing::info!(
            conversation_id = %id,
            user = %user,
            member_id = %member_id,
            "Member left conversation"
        );

        Ok((user.clone(), member_id))
    }

    /// Block the other participant of a direct conversation
    pub async fn block_direct(
        &self,
        id: &ConversationId,
        acting: &UserId,
    ) -> StoreResult<(UserId, MemberId)> {
        let mut table = self.table.write().await;
        let conversation = table.get_mut(id)?;
        if !conversation.kind.is_direct() {
            return Err(StoreError::NotDirect);
        }
        if conversation.member_for(acting).is_none() {
            return Err(StoreError::NotAMember);
        }

        let other = conversation
            .members
            .iter_mut()
            .find(|m| &m.user_id != acting)
            .ok_or(StoreError::NoSuchMember)?;
        other.standing = Standing::Blocked;

        tracing::info!(
            conversation_id = %id,
            acting = %acting,
            blocked = %other.user_id,
            "Blocked direct conversation participant"
        );

        Ok((other.user_id.clone(), other.id.clone()))
    }

    /// Change a member's standing on behalf of an owner/admin
    pub async fn set_member_standing(
        &self,
        id: &ConversationId,
        acting: &UserId,
        member_id: &MemberId,
        next: Standing,
    ) -> StoreResult<(UserId, MemberId)> {
        let mut table = self.table.write().await;
        let conversation = table.get_mut(id)?;
        if conversation.kind.is_direct() {
            return Err(StoreError::NotGroup);
        }
        if !conversation.member_for(acting).map(Member::is_manager).unwrap_or(false) {
            return Err(StoreError::Forbidden);
        }

        let member = conversation
            .member_by_id_mut(member_id)
            .ok_or(StoreError::NoSuchMember)?;
        if member.role == Role::Owner {
            return Err(StoreError::Forbidden);
        }

        let from = member.standing;
        if !from.can_become(next) {
            return Err(StoreError::InvalidTransition { from, to: next });
        }
        member.standing = next;

        tracing::info!(
            conversation_id = %id,
            acting = %acting,
            member_id = %member_id,
            from = %from,
            to = %next,
            "Changed member standing"
        );

        Ok((member.user_id.clone(), member.id.clone()))
    }

    /// Snapshot of one conversation as seen by an active member
    pub async fn get_conversation(
        &self,
        id: &ConversationId,
        viewer: &UserId,
    ) -> StoreResult<ConversationSnapshot> {
        let table = self.table.read().await;
        let conversation = table.get(id)?;
        if !conversation.is_active_member(viewer) {
            return Err(StoreError::NotAMember);
        }
        Ok(conversation.snapshot_for(viewer))
    }

    /// Conversations where `viewer` is active, in creation order
    pub async fn list_conversations(&self, viewer: &UserId) -> Vec<ConversationSnapshot> {
        let table = self.table.read().await;
        table
            .conversations
            .iter()
            .filter(|c| c.is_active_member(viewer))
            .map(|c| c.snapshot_for(viewer))
            .collect()
    }

    /// Active members of a conversation in join order; empty if unknown
    pub async fn active_members(&self, id: &ConversationId) -> Vec<UserId> {
        let table = self.table.read().await;
        match table.get(id) {
            Ok(conversation) => conversation.active_members().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Total number of conversations
    pub async fn len(&self) -> usize {
        self.table.read().await.conversations.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
