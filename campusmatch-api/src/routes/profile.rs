use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use campusmatch_shared::errors::{AppError, AppResult, ErrorCode};
use campusmatch_shared::types::auth::AuthUser;
use campusmatch_shared::types::ApiResponse;

use crate::models::{
    ClassYear, Gender, NewProfile, PreferredYears, Profile, ProfileWithContent, UpdateProfile,
};
use crate::schema::profiles;
use crate::services::content;
use crate::AppState;

pub fn load_own_profile(
    conn: &mut diesel::pg::PgConnection,
    user_id: Uuid,
) -> AppResult<Profile> {
    profiles::table
        .filter(profiles::user_id.eq(user_id))
        .first::<Profile>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))
}

// --- GET /me ---

pub async fn get_my_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<ProfileWithContent>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile = load_own_profile(&mut conn, user.id)?;
    let (photos, prompts) = content::profile_content(&mut conn, &state.storage, profile.id)?;

    Ok(Json(ApiResponse::ok(ProfileWithContent {
        profile,
        photos,
        prompts,
    })))
}

// --- POST /profiles ---

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub display_name: String,
    pub gender: Gender,
    pub interested_in: Gender,
    pub birth_date: NaiveDate,
    pub year: ClassYear,
    pub major: String,
    pub preferred_years: PreferredYears,
}

pub async fn create_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProfileRequest>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let display_name = req.display_name.trim();
    if display_name.is_empty() || display_name.len() > 50 {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            "display name must be between 1 and 50 characters",
        ));
    }
    if req.major.trim().is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "major is required"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let existing: Option<Profile> = profiles::table
        .filter(profiles::user_id.eq(user.id))
        .first(&mut conn)
        .optional()?;

    if existing.is_some() {
        return Err(AppError::new(
            ErrorCode::ProfileAlreadyExists,
            "profile already exists",
        ));
    }

    let new_profile = NewProfile {
        user_id: user.id,
        display_name: display_name.to_string(),
        gender: req.gender,
        interested_in: req.interested_in,
        birth_date: req.birth_date,
        year: req.year,
        preferred_years: Some(req.preferred_years),
        major: req.major.trim().to_string(),
        profile_complete: false,
        is_active: true,
    };

    let profile: Profile = diesel::insert_into(profiles::table)
        .values(&new_profile)
        .get_result(&mut conn)?;

    tracing::info!(user_id = %user.id, profile_id = %profile.id, "profile created");

    Ok(Json(ApiResponse::ok(profile)))
}

// --- PATCH /me ---

pub async fn update_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateProfile>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile = load_own_profile(&mut conn, user.id)?;

    let updated: Profile = diesel::update(profiles::table.find(profile.id))
        .set((&payload, profiles::updated_at.eq(chrono::Utc::now())))
        .get_result(&mut conn)?;

    content::refresh_profile_complete(&mut conn, &updated)?;

    Ok(Json(ApiResponse::ok(updated)))
}

// --- DELETE /me ---

pub async fn deactivate_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile = load_own_profile(&mut conn, user.id)?;

    diesel::update(profiles::table.find(profile.id))
        .set((
            profiles::is_active.eq(false),
            profiles::updated_at.eq(chrono::Utc::now()),
        ))
        .execute(&mut conn)?;

    tracing::info!(user_id = %user.id, "profile deactivated");

    Ok(Json(ApiResponse::ok(serde_json::json!({
        "deactivated": true
    }))))
}

// --- GET /profiles/:id ---

pub async fn get_profile_by_id(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProfileWithContent>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile: Profile = profiles::table
        .find(profile_id)
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
