use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use campusmatch_shared::errors::{AppError, AppResult};
use campusmatch_shared::types::auth::AuthUser;
use campusmatch_shared::types::ApiResponse;

use crate::models::{NewPushSubscription, PushSubscription};
use crate::schema::push_subscriptions;
use crate::services::push::{self, FanoutReport};
use crate::AppState;

// --- POST /notifications/subscriptions ---

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

/// Register a browser push subscription. Re-registering an endpoint the
/// user already holds refreshes its keys instead of duplicating it.
pub async fn subscribe(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubscribeRequest>,
) -> AppResult<Json<ApiResponse<PushSubscription>>> {
    if req.endpoint.trim().is_empty() {
        return Err(AppError::bad_request("endpoint is required"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let existing: Option<PushSubscription> = push_subscriptions::table
        .filter(push_subscriptions::user_id.eq(user.id))
        .filter(push_subscriptions::endpoint.eq(&req.endpoint))
        .first(&mut conn)
        .optional()?;

    let subscription = match existing {
        Some(sub) => diesel::update(push_subscriptions::table.find(sub.id))
            .set((
                push_subscriptions::p256dh.eq(&req.p256dh),
                push_subscriptions::auth_key.eq(&req.auth),
            ))
            .get_result(&mut conn)?,
        None => diesel::insert_into(push_subscriptions::table)
            .values(&NewPushSubscription {
                user_id: user.id,
                endpoint: req.endpoint,
                p256dh: req.p256dh,
                auth_key: req.auth,
            })
            .get_result(&mut conn)?,
    };

    tracing::info!(user_id = %user.id, "push subscription registered");

    Ok(Json(ApiResponse::ok(subscription)))
}

// --- DELETE /notifications/subscriptions ---

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: String,
}

/// Idempotent; unsubscribing an unknown endpoint succeeds with zero
/// removals.
pub async fn unsubscribe(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UnsubscribeRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let removed = diesel::delete(
        push_subscriptions::table
            .filter(push_subscriptions::user_id.eq(user.id))
            .filter(push_subscriptions::endpoint.eq(&req.endpoint)),
    )
    .execute(&mut conn)?;

    Ok(Json(ApiResponse::ok(serde_json::json!({
        "removed": removed
    }))))
}

// --- POST /notifications/test ---

pub async fn send_test(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<FanoutReport>>> {
    let payload = serde_json::json!({
        "title": "Test notification",
        "body": "Push notifications are working.",
    });

    let report = push::notify_users(&state.db, &state.push, &[user.id], payload).await?;

    Ok(Json(ApiResponse::ok(report)))
}
