//! Alerts pushed to live streams
//!
//! The full-object JSON form is `{"alertType": <tag>, "data": <payload>}`.
//! Streams send the tag as the event name and the payload as the data.

use crate::conversation::{ConversationKind, Standing};
use crate::types::{ConversationId, MemberId, MessageId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatCreated {
    pub chat_id: ConversationId,
    pub title: String,
    pub chat_type: ConversationKind,
    pub owner_id: UserId,
    /// Set for direct conversations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_user_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePosted {
    pub chat_id: ConversationId,
    pub message_id: MessageId,
    pub content: String,
    pub owner_id: UserId,
    pub created_at: Timestamp,
}

/// Roster change: joins, adds, departures, blocks and standing changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberChange {
    pub chat_id: ConversationId,
    pub member_id: MemberId,
    pub user_id: UserId,
    pub member_status: Standing,
    /// Conversation title, sent to users added by someone else
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "alertType", content = "data")]
pub enum Alert {
    NewChatCreated(ChatCreated),
    NewMessageAdded(MessagePosted),
    JoinedToChat(MemberChange),
    /// Sent to the added user only
    AddedToChat(MemberChange),
    /// Sent to the active members of the conversation
    NewMemberAdded(MemberChange),
    /// Sent to the remaining active members
    MemberLeftChat(MemberChange),
    /// Sent to the user who left
    LeftChat(MemberChange),
    MemberBlocked(MemberChange),
    MemberStatusChanged(MemberChange),
}

impl Alert {
    /// Event tag, also the SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            Alert::NewChatCreated(_) => "NewChatCreated",
            Alert::NewMessageAdded(_) => "NewMessageAdded",
            Alert::JoinedToChat(_) => "JoinedToChat",
            Alert::AddedToChat(_) => "AddedToChat",
            Alert::NewMemberAdded(_) => "NewMemberAdded",
            Alert::MemberLeftChat(_) => "MemberLeftChat",
            Alert::LeftChat(_) => "LeftChat",
            Alert::MemberBlocked(_) => "MemberBlocked",
            Alert::MemberStatusChanged(_) => "MemberStatusChanged",
        }
    }

    /// Conversation the alert concerns
    pub fn conversation_id(&self) -> &ConversationId {
        match self {
            Alert::NewChatCreated(created) => &created.chat_id,
            Alert::NewMessageAdded(posted) => &posted.chat_id,
            Alert::JoinedToChat(change)
            | Alert::AddedToChat(change)
            | Alert::NewMemberAdded(change)
            | Alert::MemberLeftChat(change)
            | Alert::LeftChat(change)
            | Alert::MemberBlocked(change)
            | Alert::MemberStatusChanged(change) => &change.chat_id,
        }
    }

    /// Payload without the tag
    pub fn payload(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Alert::NewChatCreated(created) => serde_json::to_value(created),
            Alert::NewMessageAdded(posted) => serde_json::to_value(posted),
            Alert::JoinedToChat(change)
            | Alert::AddedToChat(change)
            | Alert::NewMemberAdded(change)
            | Alert::MemberLeftChat(change)
            | Alert::LeftChat(change)
            | Alert::MemberBlocked(change)
            | Alert::MemberStatusChanged(change) => serde_json::to_value(change),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change() -> MemberChange {
        MemberChange {
            chat_id: ConversationId::new("c1"),
            member_id: MemberId::new("m1"),
            user_id: UserId::from("u1"),
            member_status: Standing::Left,
            title: None,
        }
    }

    #[test]
    fn test_full_object_form() {
        let json = serde_json::to_value(Alert::MemberLeftChat(change())).unwrap();

        assert_eq!(json["alertType"], "MemberLeftChat");
        assert_eq!(json["data"]["chatId"], "c1");
        assert_eq!(json["data"]["memberId"], "m1");
        assert_eq!(json["data"]["memberStatus"], "LEFT");
        assert!(json["data"].get("title").is_none());
    }

    #[test]
    fn test_payload_matches_data() {
        let alert = Alert::LeftChat(change());
        let full = serde_json::to_value(&alert).unwrap();

        assert_eq!(alert.payload().unwrap(), full["data"]);
        assert_eq!(alert.event_type(), full["alertType"]);
    }

    #[test]
    fn test_tags_parse_back() {
        let json = r#"{"alertType":"AddedToChat","data":{"chatId":"c","memberId":"m","userId":"u","memberStatus":"NORMAL","title":"Team"}}"#;
        let alert: Alert = serde_json::from_str(json).unwrap();

        assert_eq!(alert.event_type(), "AddedToChat");
        assert_eq!(alert.conversation_id().as_str(), "c");
    }
}
