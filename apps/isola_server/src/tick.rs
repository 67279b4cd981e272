//! The fixed-interval world tick: one daily decay pass over every player,
//! then the same invalidation broadcast a GM command ends with. The signal
//! carries no cause; clients only ever learn "something changed".

use std::time::Duration;

use tracing::{info, warn};

use isoladb::player::apply_new_day;
use isolaproto::UPDATE_SIGNAL;

use crate::AppState;

pub async fn run(state: AppState, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        match state.db.mutate_all_players(apply_new_day).await {
            Ok(n) => info!(players = n, "world tick applied"),
            Err(e) => warn!(err = %e, "world tick failed"),
        }
        state.registry.broadcast(UPDATE_SIGNAL).await;
    }
}
