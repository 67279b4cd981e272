//! Connection registry: one live socket per player name.
//!
//! The registry never touches a socket directly; each connection hands in
//! the sender half of its outbound channel and a writer task drains it.
//! Every send here is `try_send`: a wedged or dead peer must not stall
//! delivery to anyone else.

use std::collections::HashMap;

use axum::extract::ws::Message;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

pub struct Registry {
    conns: Mutex<HashMap<String, mpsc::Sender<Message>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            conns: Mutex::new(HashMap::new()),
        }
    }

    /// Register a connection for `name`, replacing and gracefully closing
    /// any stale one still mapped to the same identity.
    pub async fn add(&self, name: &str, tx: mpsc::Sender<Message>) {
        let old = self.conns.lock().await.insert(name.to_string(), tx);
        if let Some(old) = old {
            let _ = old.try_send(Message::Close(None));
            debug!(name = %name, "replaced stale connection");
        }
    }

    /// Forget the connection for `name`, but only if it is still `tx`'s:
    /// a reconnect may already have installed a newer one.
    pub async fn remove(&self, name: &str, tx: &mpsc::Sender<Message>) {
        let mut conns = self.conns.lock().await;
        if conns.get(name).is_some_and(|cur| cur.same_channel(tx)) {
            conns.remove(name);
        }
    }

    /// Best-effort push to every registered connection. Returns how many
    /// accepted the frame; failures are logged and isolated per peer.
    pub async fn broadcast(&self, signal: &[u8]) -> usize {
        let targets = {
            let conns = self.conns.lock().await;
            conns
                .iter()
                .map(|(n, tx)| (n.clone(), tx.clone()))
                .collect::<Vec<_>>()
        };

        let mut sent = 0usize;
        for (name, tx) in targets {
            match tx.try_send(Message::Binary(signal.to_vec())) {
                Ok(()) => sent += 1,
                Err(e) => warn!(name = %name, err = %e, "broadcast send failed"),
            }
        }
        sent
    }

    /// Best-effort push to one connection; a no-op when `name` is absent.
    pub async fn unicast(&self, name: &str, signal: &[u8]) {
        let tx = self.conns.lock().await.get(name).cloned();
        if let Some(tx) = tx {
            if let Err(e) = tx.try_send(Message::Binary(signal.to_vec())) {
                warn!(name = %name, err = %e, "unicast send failed");
            }
        }
    }

    pub async fn connected(&self) -> usize {
        self.conns.lock().await.len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chan() -> (mpsc::Sender<Message>, mpsc::Receiver<Message>) {
        mpsc::channel(8)
    }

    #[tokio::test]
    async fn add_closes_the_stale_connection_it_replaces() {
        let reg = Registry::new();
        let (tx1, mut rx1) = chan();
        let (tx2, mut rx2) = chan();

        reg.add("bob", tx1).await;
        reg.add("bob", tx2).await;
        assert_eq!(reg.connected().await, 1);

        assert!(matches!(rx1.recv().await, Some(Message::Close(None))));

        reg.broadcast(b"update").await;
        assert!(matches!(rx2.recv().await, Some(Message::Binary(b)) if b == b"update"));
    }

    #[tokio::test]
    async fn remove_ignores_a_superseded_sender() {
        let reg = Registry::new();
        let (tx1, _rx1) = chan();
        let (tx2, _rx2) = chan();

        reg.add("bob", tx1.clone()).await;
        reg.add("bob", tx2.clone()).await;

        // The old connection's cleanup must not evict the new one.
        reg.remove("bob", &tx1).await;
        assert_eq!(reg.connected().await, 1);

        reg.remove("bob", &tx2).await;
        assert_eq!(reg.connected().await, 0);

        // Removing an absent name is a no-op, not a crash.
        reg.remove("bob", &tx2).await;
    }

    #[tokio::test]
    async fn broadcast_isolates_per_connection_failures() {
        let reg = Registry::new();
        let (tx_dead, rx_dead) = chan();
        let (tx_live, mut rx_live) = chan();

        reg.add("alice", tx_dead).await;
        reg.add("bob", tx_live).await;
        drop(rx_dead);

        let sent = reg.broadcast(b"update").await;
        assert_eq!(sent, 1);
        assert!(matches!(rx_live.recv().await, Some(Message::Binary(b)) if b == b"update"));
    }

    #[tokio::test]
    async fn unicast_to_an_absent_name_is_a_noop() {
        let reg = Registry::new();
        reg.unicast("nessuno", b"update").await;

        let (tx, mut rx) = chan();
        reg.add("bob", tx).await;
        reg.unicast("bob", b"update").await;
        assert!(matches!(rx.recv().await, Some(Message::Binary(b)) if b == b"update"));
    }
}
