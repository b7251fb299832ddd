//! Conversation kinds

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of a conversation, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationKind {
    /// Two participants, fixed at creation
    #[serde(alias = "PEER")]
    Direct,
    /// Anyone may join and become an active member
    PublicGroup,
    /// Joining produces a request that an owner/admin must admit
    PrivateGroup,
    /// Like a public group, intended for broadcast-style use
    #[serde(alias = "PUBLIC_CANNAL")]
    PublicChannel,
    /// Like a private group, intended for broadcast-style use
    #[serde(alias = "PRIVATE_CANNAL")]
    PrivateChannel,
}

impl ConversationKind {
    pub const ALL: [ConversationKind; 5] = [
        ConversationKind::Direct,
        ConversationKind::PublicGroup,
        ConversationKind::PrivateGroup,
        ConversationKind::PublicChannel,
        ConversationKind::PrivateChannel,
    ];

    /// Wire name used in JSON snapshots
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationKind::Direct => "DIRECT",
            ConversationKind::PublicGroup => "PUBLIC_GROUP",
            ConversationKind::PrivateGroup => "PRIVATE_GROUP",
            ConversationKind::PublicChannel => "PUBLIC_CHANNEL",
            ConversationKind::PrivateChannel => "PRIVATE_CHANNEL",
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, ConversationKind::Direct)
    }

    /// Group or channel (anything with a managed roster)
    pub fn is_group(&self) -> bool {
        !self.is_direct()
    }

    /// Joins land in `Requested` instead of `Normal`
    pub fn requires_admission(&self) -> bool {
        matches!(
            self,
            ConversationKind::PrivateGroup | ConversationKind::PrivateChannel
        )
    }
}

impl fmt::Display for ConversationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown conversation kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown conversation kind: {0}")]
pub struct ParseKindError(pub String);

impl FromStr for ConversationKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "DIRECT" | "PEER" => Ok(ConversationKind::Direct),
            "PUBLIC_GROUP" => Ok(ConversationKind::PublicGroup),
            "PRIVATE_GROUP" => Ok(ConversationKind::PrivateGroup),
            "PUBLIC_CHANNEL" | "PUBLIC_CANNAL" => Ok(ConversationKind::PublicChannel),
            "PRIVATE_CHANNEL" | "PRIVATE_CANNAL" => Ok(ConversationKind::PrivateChannel),
            _ => Err(ParseKindError(s.to_string())),
        }
    }
}
