use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use campusmatch_shared::errors::{AppError, AppResult, ErrorCode};
use campusmatch_shared::types::auth::AuthUser;
use campusmatch_shared::types::ApiResponse;

use crate::constants::MAX_PHOTOS;
use crate::models::{NewPhoto, Photo};
use crate::routes::profile::load_own_profile;
use crate::schema::{likes, profile_photos};
use crate::services::content;
use crate::AppState;

// --- POST /photos ---

#[derive(Debug, Deserialize)]
pub struct AddPhotoRequest {
    /// Client-generated stable identifier, distinct from the row id
    pub id: String,
    /// Object-storage key the client uploaded the bytes to
    pub key: String,
}

pub async fn add_photo(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddPhotoRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    if req.id.trim().is_empty() || req.key.trim().is_empty() {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            "photo id and key are required",
        ));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile = load_own_profile(&mut conn, user.id)?;

    let id_taken: bool = profile_photos::table
        .filter(profile_photos::photo_id.eq(&req.id))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)?;

    if id_taken {
        return Err(AppError::new(
            ErrorCode::PhotoIdTaken,
            "photo with this id already exists",
        ));
    }

    let existing: Vec<Photo> = profile_photos::table
        .filter(profile_photos::profile_id.eq(profile.id))
        .filter(profile_photos::deleted_at.is_null())
        .load(&mut conn)?;

    if existing.len() >= MAX_PHOTOS {
        return Err(AppError::new(
            ErrorCode::PhotoLimitReached,
            format!("maximum of {MAX_PHOTOS} photos allowed"),
        ));
    }

    let next_index = existing.iter().map(|p| p.order_index).max().unwrap_or(-1) + 1;

    let new_photo = NewPhoto {
        photo_id: req.id.clone(),
        profile_id: profile.id,
        object_key: req.key,
        order_index: next_index,
    };

    diesel::insert_into(profile_photos::table)
        .values(&new_photo)
        .execute(&mut conn)?;

    content::refresh_profile_complete(&mut conn, &profile)?;

    Ok(Json(ApiResponse::ok(serde_json::json!({ "id": req.id }))))
}

// --- DELETE /photos/:photo_id ---

pub async fn delete_photo(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(photo_id): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile = load_own_profile(&mut conn, user.id)?;

    let photo: Photo = profile_photos::table
        .filter(profile_photos::photo_id.eq(&photo_id))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::PhotoNotFound, "photo not found"))?;

    if photo.profile_id != profile.id {
        return Err(AppError::forbidden("not authorized to delete this photo"));
    }

    let referenced: bool = likes::table
        .filter(likes::content_reference.eq(&photo_id))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)?;

    let soft_deleted = if referenced {
        // Referenced by a like: keep the row and the object so
        // conversation history can still show it
        diesel::update(profile_photos::table.find(photo.id))
            .set(profile_photos::deleted_at.eq(Utc::now()))
            .execute(&mut conn)?;
        true
    } else {
        diesel::delete(profile_photos::table.find(photo.id)).execute(&mut conn)?;
        state
            .storage
            .delete(&photo.object_key)
            .await
            .map_err(|e| AppError::new(ErrorCode::StorageError, e))?;
        false
    };

    content::refresh_profile_complete(&mut conn, &profile)?;

    tracing::info!(photo_id = %photo_id, soft_deleted, "photo deleted");

    Ok(Json(ApiResponse::ok(serde_json::json!({
        "id": photo_id,
        "soft_deleted": soft_deleted
    }))))
}

// --- PUT /photos/order ---

#[derive(Debug, Deserialize)]
pub struct ReorderPhotosRequest {
    pub photo_ids: Vec<String>,
}

pub async fn reorder_photos(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReorderPhotosRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile = load_own_profile(&mut conn, user.id)?;

    let all_photos: Vec<Photo> = profile_photos::table
        .filter(profile_photos::profile_id.eq(profile.id))
        .filter(profile_photos::deleted_at.is_null())
        .load(&mut conn)?;

    let ordered =
        content::reorder_permutation(&req.photo_ids, &all_photos, |p| p.photo_id.as_str(), MAX_PHOTOS)?;

    // All or nothing: a failed update must not leave a partial order
    conn.transaction::<_, AppError, _>(|conn| {
        for (index, photo) in ordered.iter().enumerate() {
            diesel::update(profile_photos::table.find(photo.id))
                .set(profile_photos::order_index.eq(index as i32))
                .execute(conn)?;
        }
        Ok(())
    })?;

    Ok(Json(ApiResponse::ok(serde_json::json!({
        "reordered": req.photo_ids.len()
    }))))
}
