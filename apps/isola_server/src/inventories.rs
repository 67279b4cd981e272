//! Player-reachable inventory surfaces: the grid view, explicit placement
//! moves, and equip/unequip. All mutations persist and broadcast.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use isoladb::MoveDest;
use isolaproto::UPDATE_SIGNAL;

use crate::account::NameQuery;
use crate::error::ApiError;
use crate::AppState;

/// `GET /inventories?name=`: own grid plus every shared storage.
pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<NameQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let name = q.required()?;
    let p = state
        .db
        .find_player(name)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("giocatore non trovato: {name}")))?;
    let others = state.db.list_storages().await;
    Ok(Json(json!({ "user": p.inventory, "others": others })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveReq {
    pub name: String,
    pub item_id: String,
    pub to: MoveDest,
}

/// `POST /inventories/move`: place one reachable item at an explicit
/// cell of its destination container.
pub async fn move_item(
    State(state): State<AppState>,
    Json(req): Json<MoveReq>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .db
        .move_item(&req.name, &req.item_id, &req.to)
        .await
        .map_err(ApiError::from)?;
    state.registry.broadcast(UPDATE_SIGNAL).await;
    info!(name = %req.name, item = %req.item_id, "item moved");
    Ok(Json(json!({ "ok": true, "message": "oggetto spostato" })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipReq {
    pub name: String,
    pub item_id: String,
}

pub async fn equip(
    State(state): State<AppState>,
    Json(req): Json<EquipReq>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .db
        .equip_item(&req.name, &req.item_id)
        .await
        .map_err(ApiError::from)?;
    state.registry.broadcast(UPDATE_SIGNAL).await;
    info!(name = %req.name, item = %req.item_id, "item equipped");
    Ok(Json(json!({ "ok": true, "message": "oggetto equipaggiato" })))
}

/// The unequipped item goes back into the grid first-fit; a full grid is
/// a conflict and the item stays worn.
pub async fn unequip(
    State(state): State<AppState>,
    Json(req): Json<EquipReq>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .db
        .unequip_item(&req.name, &req.item_id)
        .await
        .map_err(ApiError::from)?;
    state.registry.broadcast(UPDATE_SIGNAL).await;
    info!(name = %req.name, item = %req.item_id, "item unequipped");
    Ok(Json(json!({ "ok": true, "message": "oggetto riposto nello zaino" })))
}
