use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::messaging::{
    MarkReadResponse, MessageListResponse, MessageResponse, SendMessageRequest,
};
use crate::domain::conversation::{ConversationKind, ConversationRef};
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

/// Resolves the `{kind}/{ref}` path pair into a typed reference. For direct
/// conversations the ref is the peer's user id; the pair is the caller plus
/// that peer.
fn parse_ref(actor: Uuid, kind: &str, reference: Uuid) -> Result<(ConversationKind, ConversationRef)> {
    let kind = ConversationKind::parse(kind).ok_or(AppError::NotFound)?;
    let conv_ref = match kind {
        ConversationKind::Order => ConversationRef::Order(reference),
        ConversationKind::Booking => ConversationRef::Booking(reference),
        ConversationKind::Direct => ConversationRef::direct(actor, reference),
    };
    Ok((kind, conv_ref))
}

/// Appends a message to a conversation.
///
/// # Errors
/// Returns `AppError::Validation` on empty or oversized content,
/// `AppError::NotFound` for an unresolvable reference, and
/// `AppError::Forbidden` when the caller is not a participant.
pub async fn send_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((kind, reference)): Path<(String, Uuid)>,
    Json(request): Json<SendMessageRequest>,
) -> Result<impl IntoResponse> {
    let (kind, conv_ref) = parse_ref(auth_user.user_id, &kind, reference)?;

    let message = state.message_service.append(auth_user.user_id, &conv_ref, &request.content).await?;

    Ok((StatusCode::CREATED, Json(MessageResponse::from_message(kind, message))))
}

/// Lists a conversation's messages, oldest first. Loading a thread does not
/// mark it read; the client calls the read endpoint explicitly.
pub async fn list_messages(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((kind, reference)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse> {
    let (kind, conv_ref) = parse_ref(auth_user.user_id, &kind, reference)?;

    let messages = state.message_service.list(auth_user.user_id, &conv_ref).await?;
    let messages =
        messages.into_iter().map(|m| MessageResponse::from_message(kind, m)).collect();

    Ok(Json(MessageListResponse { messages }))
}

/// Marks the caller's side of a conversation as read.
pub async fn mark_read(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((kind, reference)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse> {
    let (_, conv_ref) = parse_ref(auth_user.user_id, &kind, reference)?;

    let (updated, unread) = state.message_service.mark_read(auth_user.user_id, &conv_ref).await?;

    Ok(Json(MarkReadResponse { updated, unread }))
}
