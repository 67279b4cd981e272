//! Read-only fauna/flora endpoints backing the in-game wiki.

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::AppState;

pub async fn dinosaurs(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "dinosaurs": state.db.dinosaurs().await }))
}

pub async fn plants(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "plants": state.db.plants().await }))
}
