//! HTTP API handlers

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use super::types::*;
use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chatline_core::{
    ConversationId, ConversationKind, ConversationSnapshot, MemberId, Standing, StreamFrame,
    UserId,
};
use futures::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};

/// The caller, resolved from `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub token: String,
    pub user_id: UserId,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::InvalidSession)?;

        let session = state.sessions.get_session(token).await?;
        Ok(CurrentUser {
            token: session.token,
            user_id: session.user_id,
        })
    }
}

// ============================================================================
// Session Handlers
// ============================================================================

/// POST /session - Exchange credentials for a bearer token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    if req.username.trim().is_empty() {
        return Err(ApiError::BadRequest("username can't be empty".to_string()));
    }

    let user_id = state
        .service
        .authenticate(req.username.trim(), &req.password)
        .await?;
    // verified ids always resolve
    let user = state
        .service
        .user(&user_id)
        .ok_or(ApiError::AuthenticationFailed)?;

    let token = state.sessions.create_session(&user).await;
    Ok(Json(LoginResponse { token, user }))
}

/// DELETE /session - Drop the caller's token
pub async fn logout(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> ApiResult<Json<LogoutResponse>> {
    state.sessions.remove_session(&current.token).await?;

    let closed_streams = if state.sessions.has_sessions_for(&current.user_id).await {
        0
    } else {
        state.service.close_streams(&current.user_id).await
    };

    Ok(Json(LogoutResponse { closed_streams }))
}

// ============================================================================
// Conversation Handlers
// ============================================================================

/// POST /conversations/direct - Start a direct conversation
pub async fn create_direct(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(req): Json<CreateDirectRequest>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let id = state
        .service
        .create_direct(&current.user_id, &req.title, &req.peer_user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// POST /conversations/group - Start a group or channel
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(req): Json<CreateGroupRequest>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let kind: ConversationKind = req
        .chat_type
        .parse()
        .map_err(|e: chatline_core::conversation::kind::ParseKindError| ApiError::BadRequest(e.to_string()))?;

    let id = state
        .service
        .create_group(&current.user_id, &req.title, kind)
        .await?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// GET /conversations - Conversations where the caller is active
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Json<Vec<ConversationSnapshot>> {
    Json(state.service.list_conversations(&current.user_id).await)
}

/// GET /conversations/:id - One conversation with members and messages
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<ConversationId>,
) -> ApiResult<Json<ConversationSnapshot>> {
    let snapshot = state.service.get_conversation(&current.user_id, &id).await?;
    Ok(Json(snapshot))
}

// ============================================================================
// Message Handlers
// ============================================================================

/// POST /conversations/:id/messages - Append a message
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<ConversationId>,
    Json(req): Json<PostMessageRequest>,
) -> ApiResult<(StatusCode, Json<PostMessageResponse>)> {
    let (message_id, created_at) = state
        .service
        .post_message(&current.user_id, &id, &req.content)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PostMessageResponse {
            id: message_id,
            created_at,
        }),
    ))
}

// ============================================================================
// Membership Handlers
// ============================================================================

/// POST /conversations/:id/join - Join (or request to join) a group
pub async fn join(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<ConversationId>,
) -> ApiResult<(StatusCode, Json<MemberResponse>)> {
    let member_id = state.service.join(&current.user_id, &id).await?;

    Ok((
        StatusCode::CREATED,
        Json(MemberResponse {
            member_id,
            user_id: current.user_id,
        }),
    ))
}

/// POST /conversations/:id/members - Add another user
pub async fn add_member(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<ConversationId>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<MemberResponse>)> {
    let member_id = state
        .service
        .add_member(&current.user_id, &id, &req.user_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MemberResponse {
            member_id,
            user_id: req.user_id,
        }),
    ))
}

/// POST /conversations/:id/leave - Leave a conversation
pub async fn leave(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<ConversationId>,
) -> ApiResult<Json<MemberResponse>> {
    let member_id = state.service.leave(&current.user_id, &id).await?;

    Ok(Json(MemberResponse {
        member_id,
        user_id: current.user_id,
    }))
}

/// POST /conversations/:id/block - Block the other side of a direct chat
pub async fn block_direct(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<ConversationId>,
) -> ApiResult<Json<MemberResponse>> {
    let (user_id, member_id) = state.service.block_direct(&current.user_id, &id).await?;
    Ok(Json(MemberResponse { member_id, user_id }))
}

/// PUT /conversations/:id/members/:member_id/status - Change a member's standing
pub async fn set_member_standing(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path((id, member_id)): Path<(ConversationId, MemberId)>,
    Json(req): Json<SetStandingRequest>,
) -> ApiResult<Json<MemberResponse>> {
    let standing: Standing = req
        .member_status
        .parse()
        .map_err(|e: chatline_core::conversation::membership::ParseStandingError| ApiError::BadRequest(e.to_string()))?;

    let user_id = state
        .service
        .set_member_standing(&current.user_id, &id, &member_id, standing)
        .await?;

    Ok(Json(MemberResponse { member_id, user_id }))
}

// ============================================================================
// Live Stream
// ============================================================================

/// GET /stream - Server-sent events for the caller
///
/// Each alert becomes one `event: <tag>` / `data: <json>` frame. The
/// stream ends on disconnect, logout or server shutdown.
pub async fn stream(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let live = state
        .service
        .open_stream(&current.user_id, state.shutdown.subscribe())
        .await;

    let (sink, frames) = mpsc::channel::<StreamFrame>(state.stream.buffer);
    tokio::spawn(async move {
        let end = live.run(&sink).await;
        tracing::debug!(reason = ?end, "Stream task finished");
    });

    let events = ReceiverStream::new(frames)
        .map(|frame| Ok(Event::default().event(frame.event).data(frame.data)));

    Sse::new(events).keep_alive(KeepAlive::new().interval(state.stream.keep_alive_interval))
}
