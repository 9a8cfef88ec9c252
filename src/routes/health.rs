use std::time::SystemTime;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::models::ModelSlot;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    start_time: String,
    uptime: u64,
    store: StoreHealth,
    models_available: Vec<&'static str>,
    models_loaded: usize,
}

#[derive(Debug, Serialize)]
struct StoreHealth {
    backend: &'static str,
    connected: bool,
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/", get(health))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let connected = state.store().ping().await;
    let registry = state.registry();
    let models_available = ModelSlot::ALL
        .into_iter()
        .filter(|slot| registry.is_available(*slot))
        .map(|slot| slot.key())
        .collect();

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" },
        timestamp: now_iso(),
        start_time: system_time_iso(state.started_at_system()),
        uptime: state.uptime_seconds(),
        store: StoreHealth {
            backend: state.store().backend(),
            connected,
        },
        models_available,
        models_loaded: registry.model_info().loaded_models.len(),
    })
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn system_time_iso(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Millis, true)
}
