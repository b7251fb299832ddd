//! Membership roles, standings and the transitions between standings

use crate::types::{MemberId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Conversation-level roles. Never changed after the record is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Created the conversation
    Owner,
    /// Can manage members and standings
    Admin,
    /// Default role
    Normal,
}

impl Role {
    /// Owner and Admin may add members and change standings
    pub fn can_manage(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Admin => "ADMIN",
            Role::Normal => "NORMAL",
        }
    }
}

/// A member's current participation state, distinct from the role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Standing {
    /// Active participant: sees the conversation and receives its alerts
    Normal,
    /// Blocked by the other side of a direct conversation, or by an admin
    Blocked,
    /// Asked to join a private conversation, awaiting admission
    Requested,
    /// Left voluntarily
    Left,
    /// Removed by an owner/admin
    #[serde(alias = "EXPELED")]
    Expelled,
}

impl Standing {
    pub const ALL: [Standing; 5] = [
        Standing::Normal,
        Standing::Blocked,
        Standing::Requested,
        Standing::Left,
        Standing::Expelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Standing::Normal => "NORMAL",
            Standing::Blocked => "BLOCKED",
            Standing::Requested => "REQUESTED",
            Standing::Left => "LEFT",
            Standing::Expelled => "EXPELLED",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Standing::Normal)
    }

    /// Whether an owner/admin may move a record from `self` to `next`.
    ///
    /// `Left` is terminal for managed changes: only the member can come
    /// back, through `join`. Nothing but a join may produce `Requested`.
    /// Staying in the same standing is always allowed.
    pub fn can_become(&self, next: Standing) -> bool {
        use Standing::*;

        if *self == next {
            return true;
        }

        match (*self, next) {
            (Left, _) => false,
            (_, Requested) => false,
            (Normal, Blocked | Left | Expelled) => true,
            (Requested, Normal | Blocked | Left | Expelled) => true,
            (Blocked, Normal | Left | Expelled) => true,
            (Expelled, Normal | Blocked) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Standing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown standing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown member status: {0}")]
pub struct ParseStandingError(pub String);

impl FromStr for Standing {
    type Err = ParseStandingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NORMAL" => Ok(Standing::Normal),
            "BLOCKED" => Ok(Standing::Blocked),
            "REQUESTED" => Ok(Standing::Requested),
            "LEFT" => Ok(Standing::Left),
            "EXPELLED" | "EXPELED" => Ok(Standing::Expelled),
            _ => Err(ParseStandingError(s.to_string())),
        }
    }
}

/// One membership record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Unique per record, not per user
    pub id: MemberId,

    /// The user this record belongs to
    pub user_id: UserId,

    pub role: Role,

    pub standing: Standing,

    /// When the record was created (or last reactivated through join)
    pub joined_at: Timestamp,
}

impl Member {
    pub fn new(user_id: UserId, role: Role, standing: Standing, joined_at: Timestamp) -> Self {
        Member {
            id: MemberId::generate(),
            user_id,
            role,
            standing,
            joined_at,
        }
    }

    /// Active member allowed to manage the roster
    pub fn is_manager(&self) -> bool {
        self.standing.is_active() && self.role.can_manage()
    }
}
