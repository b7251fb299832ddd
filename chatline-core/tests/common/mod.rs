/*
    Shared fixtures for integration tests

    Builds a ChatService over a small directory with cheap argon2 settings.
*/

#![allow(dead_code)]

use chatline_core::config::{Config, DirectoryConfig, UserEntry};
use chatline_core::{ChatService, UserId};

pub const USERS: [&str; 5] = ["a", "b", "c", "d", "e"];

pub fn user(id: &str) -> UserId {
    UserId::from(id)
}

pub fn config_with_buffer(subscriber_buffer: usize) -> Config {
    let users = USERS
        .iter()
        .map(|id| UserEntry {
            id: id.to_string(),
            username: format!("{id}@e.c"),
            first_name: id.to_uppercase(),
            last_name: "Test".to_string(),
            password: Some(id.to_string()),
            password_hash: None,
        })
        .collect();

    let mut config = Config {
        directory: DirectoryConfig {
            hash_memory_kib: 8,
            hash_iterations: 1,
            hash_parallelism: 1,
            users,
        },
        ..Config::default()
    };
    config.fanout.subscriber_buffer = subscriber_buffer;
    config
}

pub fn service() -> ChatService {
    service_with_buffer(64)
}

pub fn service_with_buffer(subscriber_buffer: usize) -> ChatService {
    ChatService::from_config(&config_with_buffer(subscriber_buffer))
        .expect("test directory should load")
}
