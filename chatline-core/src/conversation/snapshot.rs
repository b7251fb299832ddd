//! Read-only conversation snapshots
//!
//! These are the only view of a conversation that leaves the store. Field
//! names follow the JSON wire shape (`chatType`, `memberList`, ...).

use super::kind::ConversationKind;
use super::membership::{Role, Standing};
use crate::types::{ConversationId, MemberId, MessageId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSnapshot {
    pub id: ConversationId,
    /// For direct conversations, the other participant's user id
    pub title: String,
    pub created_at: Timestamp,
    pub chat_type: ConversationKind,
    pub member_list: Vec<MemberSnapshot>,
    pub message_list: Vec<MessageSnapshot>,
}

impl ConversationSnapshot {
    /// Member record of `user_id`, if any
    pub fn member(&self, user_id: &UserId) -> Option<&MemberSnapshot> {
        self.member_list.iter().find(|m| &m.user_id == user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSnapshot {
    pub id: MemberId,
    pub user_id: UserId,
    pub added_at: Timestamp,
    pub member_type: Role,
    pub member_status: Standing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSnapshot {
    pub id: MessageId,
    pub content: String,
    pub created_at: Timestamp,
    pub owner_id: UserId,
}
