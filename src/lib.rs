pub mod analytics;
pub mod config;
pub mod features;
pub mod logging;
pub mod models;
pub mod records;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::state::AppState;
use crate::store::AnswerStore;

pub async fn create_app() -> axum::Router {
    let config = Config::from_env();
    let store = connect_store(&config).await;
    build_router(AppState::new(config, store))
}

/// The configured store, or an empty in-memory one when it cannot be reached.
pub async fn connect_store(config: &Config) -> AnswerStore {
    match AnswerStore::connect(config.database_url.as_deref()).await {
        Ok(store) => store,
        Err(err) => {
            tracing::warn!(error = %err, "answer store not connected, using in-memory store");
            AnswerStore::Memory(Default::default())
        }
    }
}

pub fn build_router(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
