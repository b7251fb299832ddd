//! Metrics descriptions for the `metrics` facade
//!
//! No exporter is installed here. Whatever recorder the binary installs
//! picks these up; without one every call is a no-op.

use metrics::{describe_counter, describe_gauge, describe_histogram, histogram};
use std::time::Instant;

pub const CONVERSATIONS_CREATED: &str = "chat.conversations.created";
pub const MESSAGES_POSTED: &str = "chat.messages.posted";
pub const ALERTS_PUBLISHED: &str = "chat.alerts.published";
pub const ALERTS_DELIVERED: &str = "chat.alerts.delivered";
pub const SUBSCRIBERS_EVICTED: &str = "chat.subscribers.evicted";
pub const SUBSCRIBERS_ACTIVE: &str = "chat.subscribers.active";
pub const COMMAND_DURATION: &str = "chat.command.duration_ms";

/// Initialize metrics with descriptions
pub fn init_metrics() {
    // Store
    describe_counter!(CONVERSATIONS_CREATED, "Number of conversations created");
    describe_counter!(MESSAGES_POSTED, "Number of messages appended");

    // Fanout
    describe_counter!(ALERTS_PUBLISHED, "Alerts handed to the fanout");
    describe_counter!(ALERTS_DELIVERED, "Alerts queued on a subscription");
    describe_counter!(SUBSCRIBERS_EVICTED, "Subscriptions evicted for a full buffer");
    describe_gauge!(SUBSCRIBERS_ACTIVE, "Open subscriptions across all topics");

    // Commands
    describe_histogram!(COMMAND_DURATION, "Chat command duration in milliseconds");
}

/// Timer for measuring command duration
pub struct Timer {
    command: &'static str,
    start: Instant,
}

impl Timer {
    pub fn new(command: &'static str) -> Self {
        Self {
            command,
            start: Instant::now(),
        }
    }

    /// Stop the timer and record the duration
    pub fn stop(self) {
        let elapsed = self.start.elapsed();
        histogram!(COMMAND_DURATION, "command" => self.command)
            .record(elapsed.as_secs_f64() * 1000.0);
    }
}
