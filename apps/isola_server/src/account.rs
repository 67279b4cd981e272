//! Login (lazy player creation) and the own-record re-fetch target.

use argon2::Argon2;
use axum::extract::{Query, State};
use axum::Json;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use isoladb::player::{PlayerPublic, PlayerRecord};

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: Option<String>,
}

impl NameQuery {
    pub fn required(&self) -> Result<&str, ApiError> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::BadRequest("manca il nome".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginReq {
    pub name: String,
    pub password: String,
}

/// First authenticated access creates the record; later ones verify the
/// stored hash. Whether a fresh record is a GM comes from the server's
/// bootstrap list, never from the request.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("manca il nome".to_string()));
    }

    if let Some(p) = state.db.find_player(name).await {
        verify_password(&p.password_hash, &req.password)?;
        return Ok(Json(json!({ "player": PlayerPublic::from(&p) })));
    }

    let hash = hash_password(&req.password)?;
    let is_gm = state.gm_names.iter().any(|g| g == name);
    let (p, created) = state
        .db
        .find_or_create_player(name, || {
            let mut rec = PlayerRecord::new(name, &hash);
            rec.is_gm = is_gm;
            rec
        })
        .await
        .map_err(ApiError::from)?;
    if !created {
        // Lost a create race with a concurrent login; fall back to verify.
        verify_password(&p.password_hash, &req.password)?;
    } else {
        info!(name = %name, is_gm = is_gm, "player created on first login");
    }

    Ok(Json(json!({ "player": PlayerPublic::from(&p) })))
}

/// `GET /player?name=`: what a client re-reads after an invalidation push.
pub async fn player_state(
    State(state): State<AppState>,
    Query(q): Query<NameQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let name = q.required()?;
    let p = state
        .db
        .find_player(name)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("giocatore non trovato: {name}")))?;
    Ok(Json(json!({ "player": PlayerPublic::from(&p) })))
}

fn hash_password(pw: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut password_hash::rand_core::OsRng);
    Argon2::default()
        .hash_password(pw.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("hash_password failed: {e}")))
}

fn verify_password(hash: &str, pw: &str) -> Result<(), ApiError> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| ApiError::Internal(format!("bad stored hash: {e}")))?;
    Argon2::default()
        .verify_password(pw.as_bytes(), &parsed)
        .map_err(|_| ApiError::Forbidden("credenziali non valide".to_string()))
}
