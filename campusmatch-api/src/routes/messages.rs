use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use campusmatch_shared::errors::{AppError, AppResult, ErrorCode};
use campusmatch_shared::types::auth::AuthUser;
use campusmatch_shared::types::ApiResponse;

use crate::models::{
    ConversationRead, Like, LikedContent, Match, Message, NewConversationRead, NewMessage,
};
use crate::routes::matches::load_match_for;
use crate::schema::{conversation_reads, likes, matches, messages};
use crate::services::{content, push};
use crate::AppState;

fn load_marker(
    conn: &mut PgConnection,
    match_id: Uuid,
    user_id: Uuid,
) -> AppResult<Option<ConversationRead>> {
    Ok(conversation_reads::table
        .filter(conversation_reads::match_id.eq(match_id))
        .filter(conversation_reads::user_id.eq(user_id))
        .first(conn)
        .optional()?)
}

/// Set a user's read marker to `now` with nothing unread, creating it if
/// this is their first interaction with the conversation.
fn upsert_marker_read(
    conn: &mut PgConnection,
    match_id: Uuid,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<()> {
    match load_marker(conn, match_id, user_id)? {
        Some(marker) => {
            diesel::update(conversation_reads::table.find(marker.id))
                .set((
                    conversation_reads::last_read_at.eq(now),
                    conversation_reads::unread_count.eq(0),
                ))
                .execute(conn)?;
        }
        None => {
            diesel::insert_into(conversation_reads::table)
                .values(&NewConversationRead {
                    match_id,
                    user_id,
                    last_read_at: now,
                    unread_count: 0,
                })
                .execute(conn)?;
        }
    }
    Ok(())
}

/// A message has been read by the other party when their marker has
/// advanced past the send time.
fn is_read_by(marker: Option<&ConversationRead>, sent_at: DateTime<Utc>) -> bool {
    marker.is_some_and(|m| m.last_read_at >= sent_at)
}

// --- POST /matches/:id/messages ---

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

pub async fn send_message(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Json<ApiResponse<Message>>> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(AppError::new(
            ErrorCode::MessageEmpty,
            "message cannot be empty",
        ));
    }
    let content = content.to_string();

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let m = load_match_for(&mut conn, match_id, user.id)?;
    if !m.is_active {
        return Err(AppError::new(ErrorCode::MatchNotFound, "match not found"));
    }

    let recipient_id = m.other_user(user.id);
    let now = Utc::now();

    // Message, both read markers, and the match preview move together
    let message = conn.transaction::<Message, AppError, _>(|conn| {
        let message: Message = diesel::insert_into(messages::table)
            .values(&NewMessage {
                match_id: m.id,
                sender_id: user.id,
                content: content.clone(),
                sent_at: now,
            })
            .get_result(conn)?;

        upsert_marker_read(conn, m.id, user.id, now)?;

        match load_marker(conn, m.id, recipient_id)? {
            Some(marker) => {
                // Counts only what the recipient has not yet read
                if marker.last_read_at < now {
                    diesel::update(conversation_reads::table.find(marker.id))
                        .set(conversation_reads::unread_count.eq(marker.unread_count + 1))
                        .execute(conn)?;
                }
            }
            None => {
                diesel::insert_into(conversation_reads::table)
                    .values(&NewConversationRead {
                        match_id: m.id,
                        user_id: recipient_id,
                        last_read_at: DateTime::<Utc>::UNIX_EPOCH,
                        unread_count: 1,
                    })
                    .execute(conn)?;
            }
        }

        diesel::update(matches::table.find(m.id))
            .set((
                matches::last_message_at.eq(now),
                matches::last_message_sender_id.eq(user.id),
                matches::last_message.eq(&content),
                matches::updated_at.eq(now),
            ))
            .execute(conn)?;

        Ok(message)
    })?;

    let payload = serde_json::json!({
        "title": "New message",
        "body": content,
        "tag": format!("match-{}", m.id),
    });
    if let Err(err) = push::notify_users(&state.db, &state.push, &[recipient_id], payload).await {
        tracing::warn!(match_id = %m.id, error = %err, "message notification fan-out failed");
    }

    Ok(Json(ApiResponse::ok(message)))
}

// --- POST /matches/:id/read ---

pub async fn mark_read(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let m = load_match_for(&mut conn, match_id, user.id)?;
    upsert_marker_read(&mut conn, m.id, user.id, Utc::now())?;

    Ok(Json(ApiResponse::ok(serde_json::json!({ "read": true }))))
}

// --- GET /matches/:id/messages ---

#[derive(Debug, Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub is_mine: bool,
    /// Only meaningful for own messages; read receipts go one way.
    pub is_read: bool,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub match_id: Uuid,
    pub matched_at: DateTime<Utc>,
    pub initiating_like: InitiatingLike,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize)]
pub struct InitiatingLike {
    pub from_user_id: Uuid,
    pub message: Option<String>,
    pub content: Option<LikedContent>,
    pub created_at: DateTime<Utc>,
}

/// Full conversation for a match: the like that started it (its liked
/// content resolved even if since tombstoned) plus the message history
/// in send order.
pub async fn get_conversation(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ConversationResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let m: Match = load_match_for(&mut conn, match_id, user.id)?;

    let like: Like = likes::table
        .find(m.initiating_like_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::LikeNotFound, "initiating like not found"))?;

    let liked = content::liked_content(&mut conn, &state.storage, like.content_type, &like.content_reference)?;

    let history: Vec<Message> = messages::table
        .filter(messages::match_id.eq(m.id))
        .order(messages::sent_at.asc())
        .load(&mut conn)?;

    let other_marker = load_marker(&mut conn, m.id, m.other_user(user.id))?;

    let views = history
        .into_iter()
        .map(|message| {
            let is_mine = message.sender_id == user.id;
            let is_read = is_mine && is_read_by(other_marker.as_ref(), message.sent_at);
            MessageView {
                message,
                is_mine,
                is_read,
            }
        })
        .collect();

    Ok(Json(ApiResponse::ok(ConversationResponse {
        match_id: m.id,
        matched_at: m.created_at,
        initiating_like: InitiatingLike {
            from_user_id: like.from_user_id,
            message: like.message,
            content: liked,
            created_at: like.created_at,
        },
        messages: views,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn marker_at(last_read_at: DateTime<Utc>) -> ConversationRead {
        ConversationRead {
            id: Uuid::now_v7(),
            match_id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            last_read_at,
            unread_count: 0,
        }
    }

    #[test]
    fn read_when_marker_at_or_after_send_time() {
        let sent = Utc::now();

        let caught_up = marker_at(sent);
        assert!(is_read_by(Some(&caught_up), sent));

        let ahead = marker_at(sent + Duration::seconds(5));
        assert!(is_read_by(Some(&ahead), sent));
    }

    #[test]
    fn unread_when_marker_behind_or_missing() {
        let sent = Utc::now();

        let behind = marker_at(sent - Duration::seconds(5));
        assert!(!is_read_by(Some(&behind), sent));
        assert!(!is_read_by(None, sent));
    }
}
