use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod constants;
mod models;
mod routes;
mod schema;
mod services;

use campusmatch_shared::clients::db::{create_pool, DbPool};
use campusmatch_shared::clients::push::PushClient;
use campusmatch_shared::clients::storage::StorageClient;
use config::AppConfig;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub storage: StorageClient,
    pub push: PushClient,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    campusmatch_shared::middleware::init_tracing("campusmatch-api");

    let config = AppConfig::load()?;
    let port = config.port;

    // The auth extractor reads the secret from the environment
    if std::env::var("JWT_SECRET").is_err() {
        std::env::set_var("JWT_SECRET", &config.jwt_secret);
    }

    let db = create_pool(&config.database_url)?;

    let storage = StorageClient::new(
        &config.storage_endpoint,
        &config.storage_access_key,
        &config.storage_secret_key,
        &config.storage_bucket,
        &config.storage_public_url,
    )
    .await;

    let push = PushClient::new(&config.push_contact);

    let state = Arc::new(AppState {
        db,
        config,
        storage,
        push,
    });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/profiles", post(routes::profile::create_profile))
        .route("/profiles/:id", get(routes::profile::get_profile_by_id))
        .route(
            "/me",
            get(routes::profile::get_my_profile)
                .patch(routes::profile::update_profile)
                .delete(routes::profile::deactivate_profile),
        )
        .route("/photos", post(routes::photo::add_photo))
        .route("/photos/order", put(routes::photo::reorder_photos))
        .route("/photos/:photo_id", axum::routing::delete(routes::photo::delete_photo))
        .route("/prompts", post(routes::prompt::add_prompt))
        .route("/prompts/order", put(routes::prompt::reorder_prompts))
        .route(
            "/prompts/:id",
            axum::routing::patch(routes::prompt::update_prompt).delete(routes::prompt::remove_prompt),
        )
        .route("/discovery", get(routes::discovery::get_discovery_profiles))
        .route("/likes", post(routes::likes::create_like))
        .route("/likes/received", get(routes::likes::get_likes_received))
        .route("/passes", post(routes::likes::create_pass))
        .route("/matches", get(routes::matches::get_my_matches))
        .route(
            "/matches/:id",
            get(routes::matches::get_matched_profile).delete(routes::matches::unmatch),
        )
        .route(
            "/matches/:id/messages",
            get(routes::messages::get_conversation).post(routes::messages::send_message),
        )
        .route("/matches/:id/read", post(routes::messages::mark_read))
        .route(
            "/notifications/subscriptions",
            post(routes::notifications::subscribe).delete(routes::notifications::unsubscribe),
        )
        .route("/notifications/test", post(routes::notifications::send_test))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "campusmatch-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
