use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use campusmatch_shared::errors::{AppError, AppResult, ErrorCode};
use campusmatch_shared::types::auth::AuthUser;
use campusmatch_shared::types::ApiResponse;

use crate::models::{ConversationRead, Match, PhotoView, Profile, ProfileWithContent};
use crate::schema::{conversation_reads, matches, profiles};
use crate::services::content;
use crate::AppState;

pub fn load_match(conn: &mut PgConnection, match_id: Uuid) -> AppResult<Match> {
    matches::table
        .find(match_id)
        .first::<Match>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))
}

pub fn load_match_for(conn: &mut PgConnection, match_id: Uuid, user_id: Uuid) -> AppResult<Match> {
    let m = load_match(conn, match_id)?;
    if !m.involves(user_id) {
        return Err(AppError::new(
            ErrorCode::NotMatchParticipant,
            "not a participant of this match",
        ));
    }
    Ok(m)
}

/// A counterpart only shows up in lists while their profile is active;
/// deactivated accounts disappear along with their matches.
fn visible_counterpart(profile: Option<Profile>) -> Option<Profile> {
    profile.filter(|p| p.is_active)
}

// --- GET /matches ---

#[derive(Debug, Serialize)]
pub struct MatchSummary {
    pub match_id: Uuid,
    pub matched_at: DateTime<Utc>,
    pub other_user_id: Uuid,
    pub display_name: String,
    pub photo: Option<PhotoView>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message_is_mine: bool,
    pub unread_count: i32,
}

/// All active matches for the caller, most recent activity first, each
/// with the other party's headline details and the caller's unread count.
pub async fn get_my_matches(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<MatchSummary>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let my_matches: Vec<Match> = matches::table
        .filter(matches::is_active.eq(true))
        .filter(matches::user1_id.eq(user.id).or(matches::user2_id.eq(user.id)))
        .order(matches::updated_at.desc())
        .load(&mut conn)?;

    let mut summaries = Vec::with_capacity(my_matches.len());
    for m in my_matches {
        let other_id = m.other_user(user.id);

        let other: Option<Profile> = profiles::table
            .filter(profiles::user_id.eq(other_id))
            .first(&mut conn)
            .optional()?;

        // A match whose other profile is gone or deactivated is not shown
        let Some(other) = visible_counterpart(other) else {
            continue;
        };

        let photo = content::visible_photos(&mut conn, &state.storage, other.id)?
            .into_iter()
            .next();

        let marker: Option<ConversationRead> = conversation_reads::table
            .filter(conversation_reads::match_id.eq(m.id))
            .filter(conversation_reads::user_id.eq(user.id))
            .first(&mut conn)
            .optional()?;

        summaries.push(MatchSummary {
            match_id: m.id,
            matched_at: m.created_at,
            other_user_id: other_id,
            display_name: other.display_name,
            photo,
            last_message: m.last_message,
            last_message_at: m.last_message_at,
            last_message_is_mine: m.last_message_sender_id == Some(user.id),
            unread_count: marker.map(|r| r.unread_count).unwrap_or(0),
        });
    }

    Ok(Json(ApiResponse::ok(summaries)))
}

// --- GET /matches/:id ---

pub async fn get_matched_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProfileWithContent>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let m = load_match_for(&mut conn, match_id, user.id)?;
    let other_id = m.other_user(user.id);

    let profile: Profile = profiles::table
        .filter(profiles::user_id.eq(other_id))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    let (photos, prompts) = content::profile_content(&mut conn, &state.storage, profile.id)?;

    Ok(Json(ApiResponse::ok(ProfileWithContent {
        profile,
        photos,
        prompts,
    })))
}

// --- DELETE /matches/:id ---

pub async fn unmatch(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let m = load_match_for(&mut conn, match_id, user.id)?;

    // Soft deactivation; the conversation is kept for moderation purposes
    diesel::update(matches::table.find(m.id))
        .set((
            matches::is_active.eq(false),
            matches::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

    tracing::info!(match_id = %m.id, user_id = %user.id, "match deactivated");

    Ok(Json(ApiResponse::ok(serde_json::json!({
        "unmatched": true
    }))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::models::{ClassYear, Gender};

    fn profile(is_active: bool) -> Profile {
        Profile {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            display_name: "Sam".to_string(),
            gender: Gender::Female,
            interested_in: Gender::Male,
            birth_date: NaiveDate::from_ymd_opt(2004, 6, 1).unwrap(),
            year: ClassYear::Junior,
            preferred_years: None,
            major: "Economics".to_string(),
            bio: Some("hi".to_string()),
            drinking: None,
            smoking: None,
            profile_complete: true,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn deactivated_counterpart_is_hidden() {
        assert!(visible_counterpart(Some(profile(false))).is_none());
        assert!(visible_counterpart(None).is_none());
    }

    #[test]
    fn active_counterpart_is_shown() {
        let p = profile(true);
        let id = p.id;
        assert_eq!(visible_counterpart(Some(p)).map(|p| p.id), Some(id));
    }
}
