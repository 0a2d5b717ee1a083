use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use campusmatch_shared::errors::{AppError, AppResult, ErrorCode};
use campusmatch_shared::types::auth::AuthUser;
use campusmatch_shared::types::ApiResponse;

use crate::constants::{is_known_prompt, MAX_ANSWER_LENGTH, MAX_PROMPTS};
use crate::models::{NewPromptAnswer, PromptAnswer};
use crate::routes::profile::load_own_profile;
use crate::schema::{likes, profile_prompts};
use crate::services::content;
use crate::AppState;

fn validate_answer(answer: &str) -> AppResult<&str> {
    let trimmed = answer.trim();
    if trimmed.is_empty() {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            "answer cannot be empty",
        ));
    }
    if answer.len() > MAX_ANSWER_LENGTH {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            format!("answer must be {MAX_ANSWER_LENGTH} characters or less"),
        ));
    }
    Ok(trimmed)
}

// --- POST /prompts ---

#[derive(Debug, Deserialize)]
pub struct AddPromptRequest {
    /// Client-generated stable identifier for the answer
    pub id: String,
    pub prompt_id: String,
    pub answer: String,
}

pub async fn add_prompt(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddPromptRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let answer = validate_answer(&req.answer)?.to_string();

    if !is_known_prompt(&req.prompt_id) {
        return Err(AppError::new(ErrorCode::InvalidPromptId, "invalid prompt id"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile = load_own_profile(&mut conn, user.id)?;

    let id_taken: bool = profile_prompts::table
        .filter(profile_prompts::prompt_answer_id.eq(&req.id))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)?;

    if id_taken {
        return Err(AppError::new(
            ErrorCode::PromptIdTaken,
            "prompt answer with this id already exists",
        ));
    }

    let existing: Vec<PromptAnswer> = profile_prompts::table
        .filter(profile_prompts::profile_id.eq(profile.id))
        .filter(profile_prompts::deleted_at.is_null())
        .load(&mut conn)?;

    if existing.len() >= MAX_PROMPTS {
        return Err(AppError::new(
            ErrorCode::PromptLimitReached,
            format!("maximum of {MAX_PROMPTS} prompts allowed"),
        ));
    }

    if existing.iter().any(|p| p.prompt_id == req.prompt_id) {
        return Err(AppError::new(
            ErrorCode::PromptAlreadyAnswered,
            "this prompt has already been answered",
        ));
    }

    let next_index = existing.iter().map(|p| p.order_index).max().unwrap_or(-1) + 1;

    let new_prompt = NewPromptAnswer {
        prompt_answer_id: req.id.clone(),
        profile_id: profile.id,
        prompt_id: req.prompt_id,
        answer,
        order_index: next_index,
    };

    diesel::insert_into(profile_prompts::table)
        .values(&new_prompt)
        .execute(&mut conn)?;

    content::refresh_profile_complete(&mut conn, &profile)?;

    Ok(Json(ApiResponse::ok(serde_json::json!({ "id": req.id }))))
}

// --- PATCH /prompts/:id ---

#[derive(Debug, Deserialize)]
pub struct UpdatePromptRequest {
    pub answer: String,
}

pub async fn update_prompt(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(prompt_answer_id): Path<String>,
    Json(req): Json<UpdatePromptRequest>,
) -> AppResult<Json<ApiResponse<PromptAnswer>>> {
    let answer = validate_answer(&req.answer)?.to_string();

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile = load_own_profile(&mut conn, user.id)?;

    let prompt: PromptAnswer = profile_prompts::table
        .filter(profile_prompts::prompt_answer_id.eq(&prompt_answer_id))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::PromptNotFound, "prompt answer not found"))?;

    if prompt.profile_id != profile.id {
        return Err(AppError::forbidden("not authorized to update this prompt"));
    }

    if prompt.deleted_at.is_some() {
        return Err(AppError::new(
            ErrorCode::PromptDeleted,
            "cannot update a deleted prompt",
        ));
    }

    let updated: PromptAnswer = diesel::update(profile_prompts::table.find(prompt.id))
        .set(profile_prompts::answer.eq(answer))
        .get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(updated)))
}

// --- DELETE /prompts/:id ---

pub async fn remove_prompt(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(prompt_answer_id): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile = load_own_profile(&mut conn, user.id)?;

    let prompt: PromptAnswer = profile_prompts::table
        .filter(profile_prompts::prompt_answer_id.eq(&prompt_answer_id))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::PromptNotFound, "prompt answer not found"))?;

    if prompt.profile_id != profile.id {
        return Err(AppError::forbidden("not authorized to remove this prompt"));
    }

    let referenced: bool = likes::table
        .filter(likes::content_reference.eq(&prompt_answer_id))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)?;

    let soft_deleted = if referenced {
        diesel::update(profile_prompts::table.find(prompt.id))
            .set(profile_prompts::deleted_at.eq(Utc::now()))
            .execute(&mut conn)?;
        true
    } else {
        diesel::delete(profile_prompts::table.find(prompt.id)).execute(&mut conn)?;
        false
    };

    content::refresh_profile_complete(&mut conn, &profile)?;

    Ok(Json(ApiResponse::ok(serde_json::json!({
        "id": prompt_answer_id,
        "soft_deleted": soft_deleted
    }))))
}

// --- PUT /prompts/order ---

#[derive(Debug, Deserialize)]
pub struct ReorderPromptsRequest {
    pub prompt_answer_ids: Vec<String>,
}

pub async fn reorder_prompts(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReorderPromptsRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile = load_own_profile(&mut conn, user.id)?;

    let all_prompts: Vec<PromptAnswer> = profile_prompts::table
        .filter(profile_prompts::profile_id.eq(profile.id))
        .filter(profile_prompts::deleted_at.is_null())
        .load(&mut conn)?;

    let ordered = content::reorder_permutation(
        &req.prompt_answer_ids,
        &all_prompts,
        |p| p.prompt_answer_id.as_str(),
        MAX_PROMPTS,
    )?;

    conn.transaction::<_, AppError, _>(|conn| {
        for (index, prompt) in ordered.iter().enumerate() {
            diesel::update(profile_prompts::table.find(prompt.id))
                .set(profile_prompts::order_index.eq(index as i32))
                .execute(conn)?;
        }
        Ok(())
    })?;

    Ok(Json(ApiResponse::ok(serde_json::json!({
        "reordered": req.prompt_answer_ids.len()
    }))))
}
