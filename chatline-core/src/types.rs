/*
    types.rs - Identifier types shared across the core

    Defines:
    - User, conversation, member and message identifiers
    - The wall-clock timestamp type used on every record
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// UTC wall-clock timestamp, serialized as RFC 3339
pub type Timestamp = DateTime<Utc>;

/// Unique identifier for a user (opaque, assigned by the identity directory)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId(id.to_string())
    }
}

macro_rules! random_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a new random identifier (UUIDv4)
            pub fn generate() -> Self {
                $name(uuid::Uuid::new_v4().to_string())
            }

            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

random_id!(
    /// Unique identifier for a conversation
    ConversationId
);

random_id!(
    /// Unique identifier for one membership record (not for the user)
    MemberId
);

random_id!(
    /// Unique identifier for a message
    MessageId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_conversation_id_generation() {
        let id1 = ConversationId::generate();
        let id2 = ConversationId::generate();
        assert_ne!(id1, id2, "Generated IDs should be unique");
    }

    #[test]
    fn test_generated_ids_are_uuid_v4() {
        let id = MemberId::generate();
        let parsed = uuid::Uuid::parse_str(id.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
        assert_eq!(id.as_str(), id.as_str().to_lowercase());
    }

    #[test]
    fn test_many_ids_are_distinct() {
        let ids: HashSet<_> = (0..1_000).map(|_| MessageId::generate()).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn test_user_id_serializes_as_plain_string() {
        let user = UserId::from("admin@e.c");
        assert_eq!(serde_json::to_string(&user).unwrap(), "\"admin@e.c\"");
        assert_eq!(user.to_string(), "admin@e.c");
    }
}
