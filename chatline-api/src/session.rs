use chatline_core::{User, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Session token -> User session data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub username: String,
}

/// Manages active user sessions
///
/// A user may hold several sessions (one per device); live streams are
/// only torn down when the last one is removed.
#[derive(Default)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_session(&self, user: &User) -> String {
        let token = Uuid::new_v4().to_string();

        let session = Session {
            token: token.clone(),
            user_id: user.id.clone(),
            username: user.username.clone(),
        };

        self.sessions
            .write()
            .await
            .insert(token.clone(), session);

        tracing::info!(user = %user.id, "Session created");
        token
    }

    pub async fn get_session(&self, token: &str) -> ApiResult<Session> {
        self.sessions
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or(ApiError::InvalidSession)
    }

    pub async fn remove_session(&self, token: &str) -> ApiResult<Session> {
        let session = self
            .sessions
            .write()
            .await
            .remove(token)
            .ok_or(ApiError::InvalidSession)?;

        tracing::info!(user = %session.user_id, "Session removed");
        Ok(session)
    }

    /// Whether `user_id` still holds any session
    pub async fn has_sessions_for(&self, user_id: &UserId) -> bool {
        self.sessions
            .read()
            .await
            .values()
            .any(|session| &session.user_id == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        User {
            id: UserId::from(id),
            username: format!("{id}@e.c"),
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let sessions = SessionManager::new();
        let token = sessions.create_session(&user("a")).await;

        let session = sessions.get_session(&token).await.unwrap();
        assert_eq!(session.user_id, UserId::from("a"));
        assert_eq!(session.username, "a@e.c");

        sessions.remove_session(&token).await.unwrap();
        assert!(matches!(
            sessions.get_session(&token).await,
            Err(ApiError::InvalidSession)
        ));
        assert!(matches!(
            sessions.remove_session(&token).await,
            Err(ApiError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_multiple_sessions_per_user() {
        let sessions = SessionManager::new();
        let first = sessions.create_session(&user("a")).await;
        let second = sessions.create_session(&user("a")).await;
        assert_ne!(first, second);

        sessions.remove_session(&first).await.unwrap();
        assert!(sessions.has_sessions_for(&UserId::from("a")).await);

        sessions.remove_session(&second).await.unwrap();
        assert!(!sessions.has_sessions_for(&UserId::from("a")).await);
    }
}
