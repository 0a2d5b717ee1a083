use std::time::Duration;

use diesel::prelude::*;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use campusmatch_shared::clients::db::DbPool;
use campusmatch_shared::clients::push::{PushClient, PushError};
use campusmatch_shared::errors::{AppError, AppResult};

use crate::models::PushSubscription;
use crate::schema::push_subscriptions;

const MAX_CONCURRENT_DELIVERIES: usize = 10;
const MAX_RETRIES: u32 = 2;
const INITIAL_BACKOFF: Duration = Duration::from_millis(200);

#[derive(Debug, Default, Serialize)]
pub struct FanoutReport {
    pub delivered: usize,
    pub pruned: usize,
    pub errors: Vec<String>,
}

/// Fan a notification payload out to every subscription of the given
/// users. Deliveries run with bounded concurrency and per-endpoint
/// retries; one endpoint failing never aborts its siblings. Endpoints
/// the provider reports as gone (404/410) are pruned in one batched
/// deletion after the fan-out settles.
pub async fn notify_users(
    db: &DbPool,
    push: &PushClient,
    user_ids: &[Uuid],
    payload: serde_json::Value,
) -> AppResult<FanoutReport> {
    let subscriptions: Vec<PushSubscription> = {
        let mut conn = db.get().map_err(|e| AppError::internal(e.to_string()))?;
        push_subscriptions::table
            .filter(push_subscriptions::user_id.eq_any(user_ids))
            .load(&mut conn)?
    };

    if subscriptions.is_empty() {
        return Ok(FanoutReport::default());
    }

    let payload = &payload;
    let results: Vec<(PushSubscription, Result<(), PushError>)> = stream::iter(subscriptions)
        .map(|sub| async move {
            let result = deliver_with_retry(push, &sub.endpoint, payload).await;
            (sub, result)
        })
        .buffer_unordered(MAX_CONCURRENT_DELIVERIES)
        .collect()
        .await;

    let mut report = FanoutReport::default();
    let mut gone_ids: Vec<Uuid> = Vec::new();

    for (sub, result) in results {
        match result {
            Ok(()) => report.delivered += 1,
            Err(err) if err.is_endpoint_gone() => {
                tracing::info!(endpoint = %sub.endpoint, "pruning dead push endpoint");
                gone_ids.push(sub.id);
            }
            Err(err) => {
                tracing::warn!(endpoint = %sub.endpoint, error = %err, "push delivery failed");
                report.errors.push(format!("{}: {err}", sub.endpoint));
            }
        }
    }

    if !gone_ids.is_empty() {
        let mut conn = db.get().map_err(|e| AppError::internal(e.to_string()))?;
        report.pruned = diesel::delete(
            push_subscriptions::table.filter(push_subscriptions::id.eq_any(&gone_ids)),
        )
        .execute(&mut conn)?;
    }

    Ok(report)
}

async fn deliver_with_retry(
    client: &PushClient,
    endpoint: &str,
    payload: &serde_json::Value,
) -> Result<(), PushError> {
    let mut delay = INITIAL_BACKOFF;
    let mut attempt = 0;

    loop {
        match client.deliver(endpoint, payload).await {
            Ok(()) => return Ok(()),
            // No point retrying an endpoint the provider says is gone
            Err(err) if err.is_endpoint_gone() => return Err(err),
            Err(err) => {
                if attempt >= MAX_RETRIES {
                    return Err(err);
                }
                attempt += 1;
                tracing::debug!(endpoint, attempt, error = %err, "retrying push delivery");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }
}
