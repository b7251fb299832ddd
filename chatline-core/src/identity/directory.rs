//! In-memory identity directory
//!
//! Users are loaded once from configuration and never change afterwards.
//! Passwords are kept only as argon2 PHC strings.

use super::error::IdentityError;
use crate::config::{DirectoryConfig, UserEntry};
use crate::types::UserId;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

struct Account {
    user: User,
    password_hash: String,
}

/// Resolves credentials to user ids
pub struct IdentityDirectory {
    accounts: Vec<Account>,
    hasher: Argon2<'static>,
    /// Verified against when the username is unknown
    dummy_hash: String,
}

impl fmt::Debug for IdentityDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityDirectory")
            .field("users", &self.accounts.len())
            .finish()
    }
}

fn hash_password(hasher: &Argon2<'_>, password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    hasher
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| IdentityError::Hashing(e.to_string()))
}

impl IdentityDirectory {
    /// Build the directory, hashing plaintext passwords
    pub fn from_config(config: &DirectoryConfig) -> Result<Self, IdentityError> {
        let params = Params::new(
            config.hash_memory_kib,
            config.hash_iterations,
            config.hash_parallelism,
            None,
        )
        .map_err(|e| IdentityError::Hashing(e.to_string()))?;
        let hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut directory = Self {
            accounts: Vec::with_capacity(config.users.len()),
            dummy_hash: hash_password(&hasher, "chatline-dummy-password")?,
            hasher,
        };

        for entry in &config.users {
            directory.insert(entry)?;
        }

        tracing::info!(users = directory.accounts.len(), "Identity directory loaded");
        Ok(directory)
    }

    fn insert(&mut self, entry: &UserEntry) -> Result<(), IdentityError> {
        if self.accounts.iter().any(|a| a.user.id.as_str() == entry.id) {
            return Err(IdentityError::InvalidEntry(format!("duplicate user id {}", entry.id)));
        }
        if self.accounts.iter().any(|a| a.user.username == entry.username) {
            return Err(IdentityError::InvalidEntry(format!(
                "duplicate username {}",
                entry.username
            )));
        }

        let password_hash = match (&entry.password, &entry.password_hash) {
            (Some(password), None) => hash_password(&self.hasher, password)?,
            (None, Some(hash)) => {
                PasswordHash::new(hash).map_err(|e| {
                    IdentityError::InvalidEntry(format!("{}: {}", entry.username, e))
                })?;
                hash.clone()
            }
            _ => {
                return Err(IdentityError::InvalidEntry(format!(
                    "{}: exactly one of password and password_hash is required",
                    entry.username
                )))
            }
        };

        self.accounts.push(Account {
            user: User {
                id: UserId::new(entry.id.clone()),
                username: entry.username.clone(),
                first_name: entry.first_name.clone(),
                last_name: entry.last_name.clone(),
            },
            password_hash,
        });
        Ok(())
    }

    /// Resolve a username/password pair.
    ///
    /// Unknown usernames still pay for one verification, and both failure
    /// paths return the same error.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<UserId, IdentityError> {
        let account = self.accounts.iter().find(|a| a.user.username == username);
        let stored = account
            .map(|a| a.password_hash.as_str())
            .unwrap_or(self.dummy_hash.as_str());

        let parsed = PasswordHash::new(stored).map_err(|e| IdentityError::Hashing(e.to_string()))?;
        let verified = self
            .hasher
            .verify_password(password.as_bytes(), &parsed)
            .is_ok();

        match account {
            Some(account) if verified => {
                tracing::debug!(user = %account.user.id, "Authenticated");
                Ok(account.user.id.clone())
            }
            _ => {
                tracing::debug!("Authentication failed");
                Err(IdentityError::NotFound)
            }
        }
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.accounts.iter().any(|a| &a.user.id == user_id)
    }

    pub fn user(&self, user_id: &UserId) -> Option<User> {
        self.accounts
            .iter()
            .find(|a| &a.user.id == user_id)
            .map(|a| a.user.clone())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_config(users: Vec<UserEntry>) -> DirectoryConfig {
        DirectoryConfig {
            hash_memory_kib: 8,
            hash_iterations: 1,
            hash_parallelism: 1,
            users,
        }
    }

    fn entry(id: &str, username: &str, password: &str) -> UserEntry {
        UserEntry {
            id: id.to_string(),
            username: username.to_string(),
            first_name: "First".to_string(),
            last_name: "Last".to_string(),
            password: Some(password.to_string()),
            password_hash: None,
        }
    }

    fn directory() -> IdentityDirectory {
        IdentityDirectory::from_config(&cheap_config(vec![
            entry("1", "admin@e.c", "admin"),
            entry("2", "normal@e.c", "normal"),
        ]))
        .unwrap()
    }

    #[test]
    fn test_authenticate() {
        let directory = directory();
        assert_eq!(
            directory.authenticate("admin@e.c", "admin").unwrap(),
            UserId::from("1")
        );
        assert_eq!(
            directory.authenticate("normal@e.c", "normal").unwrap(),
            UserId::from("2")
        );
    }

    #[test]
    fn test_failures_are_uniform() {
        let directory = directory();
        let wrong_password = directory.authenticate("admin@e.c", "nope").unwrap_err();
        let unknown_user = directory.authenticate("ghost@e.c", "admin").unwrap_err();

        assert_eq!(wrong_password, IdentityError::NotFound);
        assert_eq!(wrong_password, unknown_user);
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[test]
    fn test_precomputed_hash() {
        let hasher = Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(8, 1, 1, None).unwrap(),
        );
        let hash = hash_password(&hasher, "kalim").unwrap();

        let mut kalim = entry("3", "kalim@e.c", "unused");
        kalim.password = None;
        kalim.password_hash = Some(hash);

        let directory = IdentityDirectory::from_config(&cheap_config(vec![kalim])).unwrap();
        assert_eq!(
            directory.authenticate("kalim@e.c", "kalim").unwrap(),
            UserId::from("3")
        );
    }

    #[test]
    fn test_invalid_entries() {
        let mut garbage = entry("1", "a", "x");
        garbage.password = None;
        garbage.password_hash = Some("not a phc string".to_string());
        assert!(matches!(
            IdentityDirectory::from_config(&cheap_config(vec![garbage])),
            Err(IdentityError::InvalidEntry(_))
        ));

        let duplicate = vec![entry("1", "a", "x"), entry("1", "b", "y")];
        assert!(matches!(
            IdentityDirectory::from_config(&cheap_config(duplicate)),
            Err(IdentityError::InvalidEntry(_))
        ));
    }

    #[test]
    fn test_lookup() {
        let directory = directory();
        assert!(directory.contains(&UserId::from("1")));
        assert!(!directory.contains(&UserId::from("9")));

        let user = directory.user(&UserId::from("2")).unwrap();
        assert_eq!(user.username, "normal@e.c");
        assert_eq!(directory.len(), 2);
    }

    #[test]
    fn test_user_json_shape() {
        let user = directory().user(&UserId::from("1")).unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["firstName"], "First");
        assert_eq!(json["lastName"], "Last");
    }
}
