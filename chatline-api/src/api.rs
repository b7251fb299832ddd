//! API routes definition

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Session routes
        .route("/session", post(handlers::login).delete(handlers::logout))
        // Conversation routes
        .route("/conversations", get(handlers::list_conversations))
        .route("/conversations/direct", post(handlers::create_direct))
        .route("/conversations/group", post(handlers::create_group))
        .route("/conversations/:id", get(handlers::get_conversation))
        // Message routes
        .route("/conversations/:id/messages", post(handlers::post_message))
        // Membership routes
        .route("/conversations/:id/join", post(handlers::join))
        .route("/conversations/:id/members", post(handlers::add_member))
        .route("/conversations/:id/leave", post(handlers::leave))
        .route("/conversations/:id/block", post(handlers::block_direct))
        .route(
            "/conversations/:id/members/:member_id/status",
            put(handlers::set_member_standing),
        )
        // Live stream
        .route("/stream", get(handlers::stream))
        // State
        .with_state(state)
}
