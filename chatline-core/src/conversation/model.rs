//! Conversation records and the rules applied to a single conversation

use super::kind::ConversationKind;
use super::membership::{Member, Role, Standing};
use super::snapshot::{ConversationSnapshot, MemberSnapshot, MessageSnapshot};
use crate::types::{ConversationId, MemberId, MessageId, Timestamp, UserId};

/// A message, immutable once appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub author_id: UserId,
    pub body: String,
    pub created_at: Timestamp,
}

/// A conversation with its roster and history
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Unique identifier
    pub id: ConversationId,

    /// Title given at creation
    pub title: String,

    pub kind: ConversationKind,

    pub created_at: Timestamp,

    /// Membership records in join order
    pub members: Vec<Member>,

    /// Messages in send order
    pub messages: Vec<Message>,
}

impl Conversation {
    fn empty(title: String, kind: ConversationKind, now: Timestamp) -> Self {
        Conversation {
            id: ConversationId::generate(),
            title,
            kind,
            created_at: now,
            members: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Create a direct conversation with exactly two active participants
    pub fn direct(title: String, owner: UserId, peer: UserId, now: Timestamp) -> Self {
        let mut conversation = Self::empty(title, ConversationKind::Direct, now);
        conversation.add_member(Member::new(owner, Role::Owner, Standing::Normal, now));
        conversation.add_member(Member::new(peer, Role::Normal, Standing::Normal, now));
        conversation
    }

    /// Create a group or channel owned by `owner`
    pub fn group(title: String, owner: UserId, kind: ConversationKind, now: Timestamp) -> Self {
        let mut conversation = Self::empty(title, kind, now);
        conversation.add_member(Member::new(owner, Role::Owner, Standing::Normal, now));
        conversation
    }

    /// Append `candidate` unless the user already has a record.
    ///
    /// An existing record is left untouched whatever its standing; the
    /// returned flag tells whether the candidate was appended.
    pub fn add_member(&mut self, candidate: Member) -> (MemberId, bool) {
        if let Some(existing) = self.member_for(&candidate.user_id) {
            return (existing.id.clone(), false);
        }

        let id = candidate.id.clone();
        self.members.push(candidate);
        (id, true)
    }

    pub fn member_for(&self, user_id: &UserId) -> Option<&Member> {
        self.members.iter().find(|m| &m.user_id == user_id)
    }

    pub fn member_for_mut(&mut self, user_id: &UserId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| &m.user_id == user_id)
    }

    pub fn member_by_id_mut(&mut self, member_id: &MemberId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| &m.id == member_id)
    }

    pub fn is_active_member(&self, user_id: &UserId) -> bool {
        self.member_for(user_id)
            .map(|m| m.standing.is_active())
            .unwrap_or(false)
    }

    /// Users with standing `Normal`, in join order
    pub fn active_members(&self) -> impl Iterator<Item = &UserId> {
        self.members
            .iter()
            .filter(|m| m.standing.is_active())
            .map(|m| &m.user_id)
    }

    /// Direct conversation between the unordered pair `{a, b}`
    pub fn is_direct_between(&self, a: &UserId, b: &UserId) -> bool {
        if !self.kind.is_direct() || self.members.len() != 2 {
            return false;
        }
        let first = &self.members[0].user_id;
        let second = &self.members[1].user_id;
        (first == a && second == b) || (first == b && second == a)
    }

    /// The participant of a direct conversation that is not `user_id`
    pub fn other_participant(&self, user_id: &UserId) -> Option<&Member> {
        if !self.kind.is_direct() {
            return None;
        }
        self.members.iter().find(|m| &m.user_id != user_id)
    }

    /// Append a message. Timestamps never go backwards within a conversation.
    pub fn append_message(&mut self, author_id: UserId, body: String, now: Timestamp) -> &Message {
        let created_at = match self.messages.last() {
            Some(last) if last.created_at > now => last.created_at,
            _ => now,
        };

        self.messages.push(Message {
            id: MessageId::generate(),
            author_id,
            body,
            created_at,
        });

        // just pushed
        &self.messages[self.messages.len() - 1]
    }

    /// Title as seen by `viewer`: direct conversations show the other side
    pub fn title_for(&self, viewer: &UserId) -> String {
        match self.other_participant(viewer) {
            Some(other) => other.user_id.to_string(),
            None => self.title.clone(),
        }
    }

    pub fn snapshot_for(&self, viewer: &UserId) -> ConversationSnapshot {
        ConversationSnapshot {
            id: self.id.clone(),
            title: self.title_for(viewer),
            created_at: self.created_at,
            chat_type: self.kind,
            member_list: self
                .members
                .iter()
                .map(|m| MemberSnapshot {
                    id: m.id.clone(),
                    user_id: m.user_id.clone(),
                    added_at: m.joined_at,
                    member_type: m.role,
                    member_status: m.standing,
                })
                .collect(),
            message_list: self
                .messages
                .iter()
                .map(|m| MessageSnapshot {
                    id: m.id.clone(),
                    content: m.body.clone(),
                    created_at: m.created_at,
                    owner_id: m.author_id.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    #[test]
    fn test_direct_has_two_active_members() {
        let conversation = Conversation::direct("Trip".into(), user("a"), user("b"), Utc::now());

        assert_eq!(conversation.members.len(), 2);
        assert_eq!(conversation.members[0].role, Role::Owner);
        assert_eq!(conversation.members[1].role, Role::Normal);
        assert!(conversation.is_active_member(&user("a")));
        assert!(conversation.is_active_member(&user("b")));
    }

    #[test]
    fn test_direct_pairing_is_unordered() {
        let conversation = Conversation::direct("Trip".into(), user("a"), user("b"), Utc::now());

        assert!(conversation.is_direct_between(&user("a"), &user("b")));
        assert!(conversation.is_direct_between(&user("b"), &user("a")));
        assert!(!conversation.is_direct_between(&user("a"), &user("c")));
    }

    #[test]
    fn test_add_member_is_noop_for_existing_user() {
        let mut conversation = Conversation::group(
            "Team".into(),
            user("owner"),
            ConversationKind::PublicGroup,
            Utc::now(),
        );

        let (first, added) =
            conversation.add_member(Member::new(user("b"), Role::Normal, Standing::Normal, Utc::now()));
        assert!(added);

        conversation.member_for_mut(&user("b")).unwrap().standing = Standing::Left;

        let (second, added) =
            conversation.add_member(Member::new(user("b"), Role::Normal, Standing::Normal, Utc::now()));
        assert!(!added);
        assert_eq!(first, second);
        assert_eq!(conversation.members.len(), 2);
        assert_eq!(conversation.member_for(&user("b")).unwrap().standing, Standing::Left);
    }

    #[test]
    fn test_message_timestamps_never_go_backwards() {
        let mut conversation = Conversation::group(
            "Team".into(),
            user("owner"),
            ConversationKind::PublicGroup,
            Utc::now(),
        );
        let now = Utc::now();

        let first = conversation.append_message(user("owner"), "one".into(), now).created_at;
        let second = conversation
            .append_message(user("owner"), "two".into(), now - Duration::seconds(5))
            .created_at;

        assert_eq!(first, second);
    }

    #[test]
    fn test_direct_title_rewritten_for_viewer() {
        let conversation = Conversation::direct("Trip".into(), user("a"), user("b"), Utc::now());

        assert_eq!(conversation.snapshot_for(&user("a")).title, "b");
        assert_eq!(conversation.snapshot_for(&user("b")).title, "a");
    }

    #[test]
    fn test_group_title_unchanged() {
        let conversation = Conversation::group(
            "Team".into(),
            user("owner"),
            ConversationKind::PrivateChannel,
            Utc::now(),
        );

        assert_eq!(conversation.snapshot_for(&user("owner")).title, "Team");
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut conversation = Conversation::direct("Trip".into(), user("a"), user("b"), Utc::now());
        conversation.append_message(user("a"), "hi".into(), Utc::now());

        let json = serde_json::to_value(conversation.snapshot_for(&user("a"))).unwrap();

        assert_eq!(json["chatType"], "DIRECT");
        assert!(json["createdAt"].is_string());
        assert_eq!(json["memberList"][0]["userId"], "a");
        assert_eq!(json["memberList"][0]["memberType"], "OWNER");
        assert_eq!(json["memberList"][1]["memberStatus"], "NORMAL");
        assert!(json["memberList"][1]["addedAt"].is_string());
        assert_eq!(json["messageList"][0]["content"], "hi");
        assert_eq!(json["messageList"][0]["ownerId"], "a");
    }
}
