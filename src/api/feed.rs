use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::feed::FeedResponse;
use crate::error::Result;
use axum::{Json, extract::State, response::IntoResponse};

/// The caller's merged conversation feed across all three kinds, plus the
/// total unread count for badge rendering. Clients poll this endpoint and
/// render it verbatim; no client-side merging.
pub async fn get_feed(auth_user: AuthUser, State(state): State<AppState>) -> Result<impl IntoResponse> {
    let feed = state.feed_service.feed_for(auth_user.user_id).await?;
    Ok(Json(FeedResponse::from(feed)))
}
