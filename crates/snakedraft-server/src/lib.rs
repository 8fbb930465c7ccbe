// HTTP front end and background scheduler for the snake draft engine.

use std::sync::Arc;

use axum::Router;
use snakedraft_core::DraftEngine;

pub mod api;
pub mod scheduler;

/// State shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DraftEngine>,
}

impl AppState {
    pub fn new(engine: Arc<DraftEngine>) -> Self {
        Self { engine }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::draft_routes())
        .merge(api::health_routes())
        .with_state(state)
}
