use axum::extract::{Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use campusmatch_shared::errors::{AppError, AppResult, ErrorCode};
use campusmatch_shared::types::auth::AuthUser;
use campusmatch_shared::types::pagination::{Cursor, CursorPage, CursorParams};
use campusmatch_shared::types::ApiResponse;

use crate::models::{
    canonical_pair, ContentType, Like, Match, NewLike, NewMatch, NewPass, Pass, PhotoView,
    Profile, PromptAnswer,
};
use crate::schema::{likes, matches, passes, profiles};
use crate::services::{content, push};
use crate::AppState;

// --- POST /likes ---

#[derive(Debug, Deserialize)]
pub struct CreateLikeRequest {
    pub to_user_id: Uuid,
    pub content_type: ContentType,
    pub content_reference: String,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateLikeResponse {
    pub like: Like,
    pub matched: bool,
}

pub async fn create_like(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLikeRequest>,
) -> AppResult<Json<ApiResponse<CreateLikeResponse>>> {
    if user.id == req.to_user_id {
        return Err(AppError::new(ErrorCode::CannotLikeSelf, "cannot like yourself"));
    }

    let message = req
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    // Like and (possibly) match commit together; a reciprocal like must
    // never be observable without its match
    let (like, new_match) = conn.transaction::<(Like, Option<Match>), AppError, _>(|conn| {
        let existing: Option<Like> = likes::table
            .filter(likes::from_user_id.eq(user.id))
            .filter(likes::to_user_id.eq(req.to_user_id))
            .first(conn)
            .optional()?;

        if existing.is_some() {
            return Err(AppError::new(
                ErrorCode::AlreadyLiked,
                "already liked this user",
            ));
        }

        let like: Like = diesel::insert_into(likes::table)
            .values(&NewLike {
                from_user_id: user.id,
                to_user_id: req.to_user_id,
                content_type: req.content_type,
                content_reference: req.content_reference.clone(),
                message,
            })
            .get_result(conn)?;

        let reciprocal: Option<Like> = likes::table
            .filter(likes::from_user_id.eq(req.to_user_id))
            .filter(likes::to_user_id.eq(user.id))
            .first(conn)
            .optional()?;

        let new_match = if reciprocal.is_some() {
            let (user1_id, user2_id) = canonical_pair(user.id, req.to_user_id);

            let existing_match: Option<Match> = matches::table
                .filter(matches::user1_id.eq(user1_id))
                .filter(matches::user2_id.eq(user2_id))
                .first(conn)
                .optional()?;

            if existing_match.is_none() {
                let created: Match = diesel::insert_into(matches::table)
                    .values(&NewMatch {
                        user1_id,
                        user2_id,
                        initiating_like_id: like.id,
                        is_active: true,
                    })
                    .get_result(conn)?;
                Some(created)
            } else {
                None
            }
        } else {
            None
        };

        Ok((like, new_match))
    })?;

    let matched = new_match.is_some();

    if let Some(m) = new_match {
        tracing::info!(match_id = %m.id, user1 = %m.user1_id, user2 = %m.user2_id, "match created");

        let payload = serde_json::json!({
            "title": "It's a match!",
            "body": "You have a new match. Say hi!",
            "icon": "/favicon/icon.png",
        });
        if let Err(err) =
            push::notify_users(&state.db, &state.push, &[m.user1_id, m.user2_id], payload).await
        {
            tracing::warn!(error = %err, "match notification fan-out failed");
        }
    }

    Ok(Json(ApiResponse::ok(CreateLikeResponse { like, matched })))
}

// --- POST /passes ---

#[derive(Debug, Deserialize)]
pub struct CreatePassRequest {
    pub to_user_id: Uuid,
}

pub async fn create_pass(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePassRequest>,
) -> AppResult<Json<ApiResponse<Pass>>> {
    if user.id == req.to_user_id {
        return Err(AppError::new(
            ErrorCode::CannotPassSelf,
            "cannot pass on yourself",
        ));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let existing: Option<Pass> = passes::table
        .filter(passes::from_user_id.eq(user.id))
        .filter(passes::to_user_id.eq(req.to_user_id))
        .first(&mut conn)
        .optional()?;

    if existing.is_some() {
        return Err(AppError::new(
            ErrorCode::AlreadyPassed,
            "already passed on this user",
        ));
    }

    let pass: Pass = diesel::insert_into(passes::table)
        .values(&NewPass {
            from_user_id: user.id,
            to_user_id: req.to_user_id,
        })
        .get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(pass)))
}

// --- GET /likes/received ---

#[derive(Debug, Serialize)]
pub struct ReceivedLike {
    #[serde(flatten)]
    pub like: Like,
    pub profile: Profile,
    pub photos: Vec<PhotoView>,
    pub prompts: Vec<PromptAnswer>,
}

pub async fn get_likes_received(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<CursorParams>,
) -> AppResult<Json<ApiResponse<CursorPage<ReceivedLike>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let cursor = params
        .cursor
        .as_deref()
        .map(Cursor::decode)
        .transpose()
        .map_err(AppError::bad_request)?;

    let limit = params.limit();

    let mut query = likes::table
        .filter(likes::to_user_id.eq(user.id))
        .order((likes::created_at.desc(), likes::id.desc()))
        .limit(limit)
        .into_boxed();

    if let Some(cursor) = cursor {
        query = query.filter(
            likes::created_at.lt(cursor.ts).or(likes::created_at
                .eq(cursor.ts)
                .and(likes::id.lt(cursor.id))),
        );
    }

    let page: Vec<Like> = query.load(&mut conn)?;

    let is_done = (page.len() as i64) < limit;
    let continue_cursor = page.last().map(|like| Cursor {
        ts: like.created_at,
        id: like.id,
    });

    // Likers whose profile has vanished or deactivated drop off the page
    let mut enriched = Vec::with_capacity(page.len());
    for like in page {
        let profile: Option<Profile> = profiles::table
            .filter(profiles::user_id.eq(like.from_user_id))
            .filter(profiles::is_active.eq(true))
            .first(&mut conn)
            .optional()?;

        let Some(profile) = profile else {
            continue;
        };

        let (photos, prompts) = content::profile_content(&mut conn, &state.storage, profile.id)?;
        enriched.push(ReceivedLike {
            like,
            profile,
            photos,
            prompts,
        });
    }

    Ok(Json(ApiResponse::ok(CursorPage::new(
        enriched,
        continue_cursor,
        is_done,
    ))))
}
