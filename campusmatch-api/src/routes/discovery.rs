use axum::extract::{Query, State};
use axum::Json;
use std::sync::Arc;

use campusmatch_shared::errors::{AppError, AppResult};
use campusmatch_shared::types::auth::AuthUser;
use campusmatch_shared::types::pagination::{Cursor, CursorPage, CursorParams};
use campusmatch_shared::types::ApiResponse;

use crate::models::ProfileWithContent;
use crate::routes::profile::load_own_profile;
use crate::services::{content, discovery};
use crate::AppState;

/// GET /discovery - one page of swipeable candidates for the caller,
/// each carrying its currently-visible photos and prompts. Read-only;
/// nothing is marked as viewed.
pub async fn get_discovery_profiles(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<CursorParams>,
) -> AppResult<Json<ApiResponse<CursorPage<ProfileWithContent>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let me = load_own_profile(&mut conn, user.id)?;

    let cursor = params
        .cursor
        .as_deref()
        .map(Cursor::decode)
        .transpose()
        .map_err(AppError::bad_request)?;

    let interacted = discovery::interacted_set(&mut conn, user.id)?;
    let raw_page = discovery::discover(&mut conn, &me, &interacted, cursor, params.limit())?;

    let mut enriched = Vec::with_capacity(raw_page.page.len());
    for profile in raw_page.page {
        let (photos, prompts) = content::profile_content(&mut conn, &state.storage, profile.id)?;
        enriched.push(ProfileWithContent {
            profile,
            photos,
            prompts,
        });
    }

    tracing::debug!(
        user_id = %user.id,
        candidates = enriched.len(),
        is_done = raw_page.is_done,
        "discovery page served"
    );

    Ok(Json(ApiResponse::ok(CursorPage {
        page: enriched,
        continue_cursor: raw_page.continue_cursor,
        is_done: raw_page.is_done,
    })))
}
