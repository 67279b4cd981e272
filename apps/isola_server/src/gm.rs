//! The GM console surface: state view, the command interpreter, and the
//! GM-mediated item transfer.
//!
//! Every successful mutation ends in a global broadcast of the
//! invalidation signal, single-target commands included.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use isoladb::player::{apply_new_day, clamp_gauge, PlayerPublic, PlayerRecord};
use isoladb::StoreError;
use isolaproto::command::{self, GmCommand, Target};
use isolaproto::UPDATE_SIGNAL;

use crate::account::NameQuery;
use crate::error::ApiError;
use crate::AppState;

/// `GET /gm/state?name=`: every player, sanitized, for the console table.
pub async fn state_view(
    State(state): State<AppState>,
    Query(q): Query<NameQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let name = q.required()?;
    require_gm(&state, name).await?;
    let players = state
        .db
        .list_players()
        .await
        .iter()
        .map(PlayerPublic::from)
        .collect::<Vec<_>>();
    Ok(Json(json!({ "players": players })))
}

#[derive(Debug, Deserialize)]
pub struct CommandReq {
    pub name: String,
    pub command: String,
}

pub async fn command(
    State(state): State<AppState>,
    Json(req): Json<CommandReq>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let message = run_command(&state, &req.name, &req.command).await?;
    Ok(Json(json!({ "ok": true, "message": message })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReq {
    pub name: String,
    pub from: String,
    pub item_id: String,
}

/// Move one item out of a player's grid into the issuing GM's own.
/// All-or-nothing: a full GM grid leaves the source untouched.
pub async fn transfer(
    State(state): State<AppState>,
    Json(req): Json<TransferReq>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let gm = require_gm(&state, &req.name).await?;
    let item = state
        .db
        .transfer_item(&req.from, &gm.name, &req.item_id)
        .await
        .map_err(|e| match e {
            StoreError::NoSpace => {
                ApiError::Conflict("inventario pieno: trasferimento annullato".to_string())
            }
            other => ApiError::from(other),
        })?;

    state.registry.broadcast(UPDATE_SIGNAL).await;
    info!(gm = %gm.name, from = %req.from, item = %item.name, "item transferred");
    Ok(Json(json!({
        "ok": true,
        "message": format!("{} trasferito da {}", item.name, req.from)
    })))
}

/// Authorize, parse, apply, broadcast.
pub async fn run_command(state: &AppState, gm_name: &str, line: &str) -> Result<String, ApiError> {
    require_gm(state, gm_name).await?;
    let (cmd, target) = command::parse(line)?;

    let message = apply(state, &cmd, &target).await?;

    state.registry.broadcast(UPDATE_SIGNAL).await;
    info!(gm = %gm_name, command = %line, "gm command applied");
    Ok(message)
}

async fn require_gm(state: &AppState, name: &str) -> Result<PlayerRecord, ApiError> {
    match state.db.find_player(name).await {
        Some(p) if p.is_gm => Ok(p),
        _ => Err(ApiError::Forbidden("non sei un game master".to_string())),
    }
}

async fn apply(state: &AppState, cmd: &GmCommand, target: &Target) -> Result<String, ApiError> {
    // `_newday` ignores its target token and always hits everyone.
    if matches!(cmd, GmCommand::NewDay) {
        let n = state
            .db
            .mutate_all_players(apply_new_day)
            .await
            .map_err(ApiError::from)?;
        return Ok(format!("nuovo giorno: {n} giocatori aggiornati"));
    }

    let names: Vec<String> = match target {
        Target::All => state
            .db
            .list_players()
            .await
            .into_iter()
            .map(|p| p.name)
            .collect(),
        Target::Name(n) => {
            if state.db.find_player(n).await.is_none() {
                return Err(ApiError::NotFound(format!("giocatore non trovato: {n}")));
            }
            vec![n.clone()]
        }
    };

    if let GmCommand::Give { item, amount } = cmd {
        let base = state
            .db
            .base_item(item)
            .await
            .ok_or_else(|| ApiError::NotFound(format!("oggetto sconosciuto: {item}")))?;
        let mut parts = Vec::new();
        for name in &names {
            match state.db.grant_items(name, &base, *amount).await {
                Ok(placed) => parts.push(format!("{name}: {placed}/{amount}")),
                Err(e) => parts.push(format!("{name}: {}", ApiError::from(e).message())),
            }
        }
        return Ok(format!("{}: {}", base.name, parts.join(", ")));
    }

    // Per-target loop: one failing target never stops the rest, the
    // report aggregates whatever went wrong.
    let mut failed = Vec::new();
    for name in &names {
        if let Err(e) = state
            .db
            .mutate_player(name, |p| apply_to_player(cmd, p))
            .await
        {
            failed.push(format!("{name}: {}", ApiError::from(e).message()));
        }
    }
    if failed.is_empty() {
        if names.len() == 1 {
            Ok("fatto".to_string())
        } else {
            Ok(format!("fatto ({} giocatori)", names.len()))
        }
    } else {
        Ok(format!("completato con errori: {}", failed.join(", ")))
    }
}

fn apply_to_player(cmd: &GmCommand, p: &mut PlayerRecord) {
    match cmd {
        GmCommand::Damage(a) => p.biofeedback = clamp_gauge(p.biofeedback - a),
        GmCommand::Heal(a) => p.biofeedback = clamp_gauge(p.biofeedback + a),
        GmCommand::Feed(a) => p.hunger = clamp_gauge(p.hunger + a),
        GmCommand::Drink(a) => p.thirst = clamp_gauge(p.thirst + a),
        GmCommand::Rest(a) => p.sleep = clamp_gauge(p.sleep + a),
        GmCommand::Energy(a) => p.energy = clamp_gauge(p.energy + a),
        GmCommand::QuickStrangle => p.oxygen = 0.0,
        GmCommand::SlowStrangle => p.oxygen = clamp_gauge(p.oxygen - 50.0),
        GmCommand::Ill => p.is_sick = true,
        GmCommand::Fix => p.is_sick = false,
        GmCommand::Sack => p.inventory.clear(),
        // Handled before the per-target loop.
        GmCommand::Give { .. } | GmCommand::NewDay => {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::ws::Message;
    use tokio::sync::mpsc;

    use crate::registry::Registry;

    use super::*;

    async fn test_state() -> (AppState, tempfile::TempDir) {
        let tmp = tempfile::tempdir().expect("tempdir");
        let db = isoladb::Db::open(tmp.path()).expect("open db");
        let state = AppState {
            db: Arc::new(db),
            registry: Arc::new(Registry::new()),
            gm_names: Arc::new(Vec::new()),
        };
        (state, tmp)
    }

    async fn add_player(state: &AppState, name: &str, is_gm: bool) {
        state
            .db
            .find_or_create_player(name, || {
                let mut p = PlayerRecord::new(name, "h");
                p.is_gm = is_gm;
                p
            })
            .await
            .expect("create player");
    }

    #[tokio::test]
    async fn non_gm_is_rejected_without_mutation() {
        let (state, _tmp) = test_state().await;
        add_player(&state, "bob", false).await;

        let err = run_command(&state, "bob", "_dmg bob 30").await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
        let err = run_command(&state, "chi", "_dmg bob 30").await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);

        let bob = state.db.find_player("bob").await.expect("bob");
        assert_eq!(bob.biofeedback, 100.0);
    }

    #[tokio::test]
    async fn unknown_target_is_not_found() {
        let (state, _tmp) = test_state().await;
        add_player(&state, "riko", true).await;

        let err = run_command(&state, "riko", "_dmg nessuno 5").await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);

        let err = run_command(&state, "riko", "_vola riko").await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn gauges_clamp_at_both_ends() {
        let (state, _tmp) = test_state().await;
        add_player(&state, "riko", true).await;
        add_player(&state, "bob", false).await;

        run_command(&state, "riko", "_dmg bob 150").await.expect("dmg");
        assert_eq!(state.db.find_player("bob").await.expect("bob").biofeedback, 0.0);

        run_command(&state, "riko", "_heal bob 9999").await.expect("heal");
        assert_eq!(state.db.find_player("bob").await.expect("bob").biofeedback, 100.0);

        run_command(&state, "riko", "_f bob -130").await.expect("f");
        assert_eq!(state.db.find_player("bob").await.expect("bob").hunger, 0.0);
    }

    #[tokio::test]
    async fn strangle_verbs_hit_oxygen() {
        let (state, _tmp) = test_state().await;
        add_player(&state, "riko", true).await;
        add_player(&state, "bob", false).await;

        run_command(&state, "riko", "_slowstrangle bob").await.expect("slow");
        assert_eq!(state.db.find_player("bob").await.expect("bob").oxygen, 50.0);
        run_command(&state, "riko", "_slowstrangle bob").await.expect("slow");
        assert_eq!(state.db.find_player("bob").await.expect("bob").oxygen, 0.0);
        run_command(&state, "riko", "_slowstrangle bob").await.expect("slow");
        assert_eq!(state.db.find_player("bob").await.expect("bob").oxygen, 0.0);

        run_command(&state, "riko", "_heal bob 1").await.expect("heal");
        run_command(&state, "riko", "_quickstrangle bob").await.expect("quick");
        assert_eq!(state.db.find_player("bob").await.expect("bob").oxygen, 0.0);
    }

    #[tokio::test]
    async fn give_places_row_major_and_reports_counts() {
        let (state, _tmp) = test_state().await;
        add_player(&state, "riko", true).await;
        add_player(&state, "bob", false).await;

        let msg = run_command(&state, "riko", "give bob Roccia 3").await.expect("give");
        assert_eq!(msg, "Roccia: bob: 3/3");
        let bob = state.db.find_player("bob").await.expect("bob");
        let coords = bob.inventory.iter().map(|i| (i.x, i.y)).collect::<Vec<_>>();
        assert_eq!(coords, vec![(0, 0), (1, 0), (2, 0)]);

        // Near-full grid: the report carries the true count, not the ask.
        let msg = run_command(&state, "riko", "give bob Roccia 100").await.expect("give");
        assert_eq!(msg, "Roccia: bob: 67/100");

        let err = run_command(&state, "riko", "give bob Unobtainio").await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn give_all_reports_each_target() {
        let (state, _tmp) = test_state().await;
        add_player(&state, "riko", true).await;
        add_player(&state, "anna", false).await;
        add_player(&state, "bob", false).await;

        let msg = run_command(&state, "riko", "give all Roccia 2").await.expect("give");
        assert_eq!(msg, "Roccia: anna: 2/2, bob: 2/2, riko: 2/2");
    }

    #[tokio::test]
    async fn newday_decays_heals_and_respects_sickness() {
        let (state, _tmp) = test_state().await;
        add_player(&state, "riko", true).await;
        add_player(&state, "bob", false).await;
        add_player(&state, "lia", false).await;

        state
            .db
            .mutate_player("bob", |p| {
                p.hunger = 10.0;
                p.biofeedback = 30.0;
            })
            .await
            .expect("setup");
        state
            .db
            .mutate_player("lia", |p| {
                p.is_sick = true;
                p.biofeedback = 30.0;
            })
            .await
            .expect("setup");

        run_command(&state, "riko", "_newday all").await.expect("newday");

        let bob = state.db.find_player("bob").await.expect("bob");
        assert_eq!(bob.hunger, 0.0);
        assert_eq!(bob.biofeedback, 100.0);
        let lia = state.db.find_player("lia").await.expect("lia");
        assert_eq!(lia.biofeedback, 30.0);
    }

    #[tokio::test]
    async fn sack_and_sickness_flags() {
        let (state, _tmp) = test_state().await;
        add_player(&state, "riko", true).await;
        add_player(&state, "bob", false).await;

        run_command(&state, "riko", "give bob Roccia 3").await.expect("give");
        run_command(&state, "riko", "ill bob").await.expect("ill");
        assert!(state.db.find_player("bob").await.expect("bob").is_sick);

        run_command(&state, "riko", "sack bob").await.expect("sack");
        assert!(state.db.find_player("bob").await.expect("bob").inventory.is_empty());

        run_command(&state, "riko", "fix bob").await.expect("fix");
        assert!(!state.db.find_player("bob").await.expect("bob").is_sick);
    }

    #[tokio::test]
    async fn success_broadcasts_and_failure_does_not() {
        let (state, _tmp) = test_state().await;
        add_player(&state, "riko", true).await;
        add_player(&state, "bob", false).await;

        let (tx, mut rx) = mpsc::channel::<Message>(8);
        state.registry.add("bob", tx).await;

        run_command(&state, "riko", "_dmg bob 5").await.expect("dmg");
        assert!(matches!(rx.recv().await, Some(Message::Binary(b)) if b == UPDATE_SIGNAL));

        run_command(&state, "riko", "_boom bob").await.unwrap_err();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn transfer_is_atomic_under_a_full_gm_grid() {
        let (state, _tmp) = test_state().await;
        add_player(&state, "riko", true).await;
        add_player(&state, "bob", false).await;

        run_command(&state, "riko", "give bob Roccia 1").await.expect("give");
        run_command(&state, "riko", "give riko Roccia 70").await.expect("fill");
        let item_id = state.db.find_player("bob").await.expect("bob").inventory[0]
            .id
            .clone();

        let err = state
            .db
            .transfer_item("bob", "riko", &item_id)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NoSpace);
        let bob = state.db.find_player("bob").await.expect("bob");
        assert_eq!(bob.inventory.len(), 1);
    }
}
