//! services/api/src/bin/api.rs

use std::sync::Arc;

use api_lib::{
    adapters::db::DbAdapter,
    config::Config,
    error::ApiError,
    web::{
        commit_sheet_handler, create_slot_handler, list_attendance_handler, list_slots_handler,
        mark_attendance_handler, state::AppState, stats_handler, update_slot_handler,
    },
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use timetable_core::ports::{AttendanceStore, SlotStore};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Build the Shared AppState ---
    // The same adapter backs both engine ports.
    let slots: Arc<dyn SlotStore> = db_adapter.clone();
    let attendance: Arc<dyn AttendanceStore> = db_adapter;
    let app_state = Arc::new(AppState {
        slots,
        attendance,
        config: config.clone(),
    });

    let allowed_origin = config.allowed_origin.parse::<HeaderValue>().map_err(|_| {
        ApiError::Internal(format!(
            "Invalid ALLOWED_ORIGIN: '{}'",
            config.allowed_origin
        ))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    let app = Router::new()
        .route(
            "/scopes/{scope_id}/slots",
            post(create_slot_handler).get(list_slots_handler),
        )
        .route(
            "/scopes/{scope_id}/slots/{slot_id}",
            put(update_slot_handler),
        )
        .route(
            "/scopes/{scope_id}/attendance",
            get(list_attendance_handler),
        )
        .route(
            "/scopes/{scope_id}/attendance/sheet",
            post(commit_sheet_handler),
        )
        .route(
            "/scopes/{scope_id}/attendance/stats",
            get(stats_handler),
        )
        .route(
            "/scopes/{scope_id}/attendance/{subject_id}",
            put(mark_attendance_handler),
        )
        .layer(cors)
        .with_state(app_state);

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
