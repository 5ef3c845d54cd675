// rest_api/src/lib.rs
//
// HTTP surface for the clinic core: router, shared state, server startup
// with graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::Method;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use calendar::{GoogleCalendarApi, ReconciliationWorker};
use clinical::{EventRecorder, ScheduleManager, SessionLifecycle};
use security::RolesConfig;
use storage::ClinicStore;

pub mod auth;
pub mod config;
pub mod envelope;
pub mod handlers;

pub use config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub roles: Arc<RolesConfig>,
    pub store: ClinicStore,
    pub schedules: ScheduleManager,
    pub lifecycle: SessionLifecycle,
    pub events: EventRecorder,
    /// Absent when the deployment has no calendar integration configured.
    pub google: Option<Arc<GoogleCalendarApi>>,
    pub worker: Option<Arc<ReconciliationWorker>>,
}

impl AppState {
    pub fn new(config: ServerConfig, roles: RolesConfig, store: ClinicStore) -> Self {
        let google = config
            .google
            .clone()
            .map(|g| Arc::new(GoogleCalendarApi::new(g)));
        let worker = google.as_ref().map(|api| {
            Arc::new(ReconciliationWorker::new(
                store.clone(),
                api.clone() as Arc<dyn calendar::CalendarApi>,
            ))
        });
        AppState {
            config: Arc::new(config),
            roles: Arc::new(roles),
            schedules: ScheduleManager::new(store.clone()),
            lifecycle: SessionLifecycle::new(store.clone()),
            events: EventRecorder::new(store.clone()),
            store,
            google,
            worker,
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "success": true, "data": { "status": "ok" } }))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/health", get(health))
        .route(
            "/schedules/patients",
            get(handlers::schedules::list_patient_schedules)
                .post(handlers::schedules::create_patient_schedule),
        )
        .route(
            "/schedules/patients/:id",
            get(handlers::schedules::get_patient_schedule)
                .put(handlers::schedules::update_patient_schedule)
                .delete(handlers::schedules::delete_patient_schedule),
        )
        .route(
            "/schedules/nurses",
            get(handlers::schedules::list_nurse_schedules)
                .post(handlers::schedules::create_nurse_schedule),
        )
        .route(
            "/schedules/nurses/:id",
            get(handlers::schedules::get_nurse_schedule)
                .put(handlers::schedules::update_nurse_schedule)
                .delete(handlers::schedules::delete_nurse_schedule),
        )
        .route(
            "/hd-sessions",
            get(handlers::sessions::list_sessions).post(handlers::sessions::start_session),
        )
        .route(
            "/hd-sessions/:id",
            get(handlers::sessions::get_session)
                .put(handlers::sessions::update_session)
                .delete(handlers::sessions::delete_session),
        )
        .route(
            "/hd-sessions/:id/complete",
            axum::routing::post(handlers::sessions::complete_session),
        )
        .route(
            "/hd-sessions/:id/complications",
            get(handlers::events::list_complications).post(handlers::events::add_complication),
        )
        .route(
            "/hd-sessions/:id/complications/:complication_id/resolve",
            axum::routing::post(handlers::events::resolve_complication),
        )
        .route(
            "/hd-sessions/:id/medications",
            get(handlers::events::list_medications).post(handlers::events::add_medication),
        )
        .route("/portal/sessions", get(handlers::portal::list_sessions))
        .route("/portal/sessions/:id", get(handlers::portal::get_session))
        .route("/google/connect", get(handlers::google::connect))
        .route(
            "/google/sync",
            get(handlers::google::status)
                .post(handlers::google::reconcile)
                .delete(handlers::google::disconnect),
        )
        .route("/google/callback", get(handlers::google::callback))
        .with_state(state)
        .layer(cors)
}

/// Boots the HTTP server and runs it until `shutdown_rx` fires.
pub async fn start_server(config: ServerConfig, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
    let roles = RolesConfig::from_yaml_file(&config.roles_file)
        .with_context(|| format!("failed to load roles file: {}", config.roles_file))?;
    let store = ClinicStore::connect(&config.database_url)
        .await
        .map_err(|e| anyhow::anyhow!("failed to open clinical record store: {}", e))?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;
    let state = AppState::new(config, roles, store);
    let app = router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "clinic API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
            info!("shutdown signal received");
        })
        .await
        .context("server error")?;

    info!("clinic API stopped");
    Ok(())
}
