//! Dental Records HTTP API
//!
//! JSON endpoints over a [`PatientStore`]:
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/health` | backend liveness |
//! | POST | `/api/patients` | create |
//! | GET | `/api/patients?search=&filter=&sort=` | list |
//! | GET, DELETE | `/api/patients/:id` | fetch / remove one |
//! | POST | `/api/patients/delete` | remove many |
//! | POST | `/api/patients/:id/payments` | record a payment |
//! | GET | `/api/dashboard?year=&month=` | dashboard aggregates |
//!
//! Responses use the envelope `{"success": true, "data": ...}` or
//! `{"success": false, "error": "..."}`.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use dental_records_core::store::PatientStore;

pub use config::{Backend, CliArgs, ServerConfig};
pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PatientStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn PatientStore>) -> Self {
        Self { store }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/api/patients",
            get(routes::list_patients).post(routes::create_patient),
        )
        .route("/api/patients/delete", post(routes::delete_patients))
        .route(
            "/api/patients/:id",
            get(routes::get_patient).delete(routes::delete_patient),
        )
        .route("/api/patients/:id/payments", post(routes::record_payment))
        .route("/api/dashboard", get(routes::dashboard))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
