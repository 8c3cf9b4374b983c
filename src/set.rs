//! Tracking of all live connections owned by one client or server instance.
//!
//! The membership table is the only state shared across connections, guarded
//! by a single mutex. A tracked connection that finishes closing on its own
//! is pruned automatically; `stop_all` forces the rest down and waits
//! (bounded) for each close to be delivered.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::connection::Connection;

/// Identity of a tracked connection within its set.
pub type ConnectionId = u64;

/// Tracks every live [`Connection`] of one client/server instance.
#[derive(Default)]
pub struct ConnectionSet {
    connections: Arc<Mutex<HashMap<ConnectionId, Connection>>>,
    next_id: AtomicU64,
}

impl ConnectionSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a connection until it closes.
    ///
    /// Spawns a watcher that removes the entry once the connection's
    /// `on_close` has been delivered, so connections closing on their own
    /// release their tracking without `stop_all`. Must be called within a
    /// tokio runtime.
    pub fn insert(&self, connection: Connection) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections
            .lock()
            .unwrap()
            .insert(id, connection.clone());

        let connections = self.connections.clone();
        tokio::spawn(async move {
            connection.closed().await;
            connections.lock().unwrap().remove(&id);
        });

        id
    }

    /// Look up a tracked connection.
    #[must_use]
    pub fn get(&self, id: ConnectionId) -> Option<Connection> {
        self.connections.lock().unwrap().get(&id).cloned()
    }

    /// Number of tracked (not yet fully closed) connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    /// Returns `true` if no connections are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Force every tracked connection into termination and wait for each
    /// close to be delivered, bounded per connection by its configured
    /// `stop_timeout`. Tracking is released for every member, including any
    /// that failed to confirm within the bound.
    ///
    /// Safe to call concurrently with connections closing on their own.
    pub async fn stop_all(&self) {
        let snapshot: Vec<(ConnectionId, Connection)> = self
            .connections
            .lock()
            .unwrap()
            .iter()
            .map(|(id, conn)| (*id, conn.clone()))
            .collect();

        for (_, connection) in &snapshot {
            connection.force_shutdown("Shutdown");
        }

        for (id, connection) in snapshot {
            let bound = connection.config().stop_timeout;
            let _ = tokio::time::timeout(bound, connection.closed()).await;
            self.connections.lock().unwrap().remove(&id);
        }
    }
}

impl std::fmt::Debug for ConnectionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSet")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::close::CloseCode;
    use crate::config::Config;
    use crate::connection::writer::tests::RecordingSink;
    use crate::dispatch::Handler;

    struct NopHandler;
    impl Handler for NopHandler {}

    fn spawn_connection() -> Connection {
        let (sink, _frames, _shutdown) = RecordingSink::new(None);
        Connection::spawn(sink, NopHandler, Config::default())
    }

    #[tokio::test]
    async fn test_insert_and_len() {
        let set = ConnectionSet::new();
        assert!(set.is_empty());

        let id = set.insert(spawn_connection());
        assert_eq!(set.len(), 1);
        assert!(set.get(id).is_some());
    }

    #[tokio::test]
    async fn test_stop_all_empties_the_set() {
        let set = ConnectionSet::new();
        let mut conns = Vec::new();
        for _ in 0..3 {
            let conn = spawn_connection();
            set.insert(conn.clone());
            conns.push(conn);
        }

        set.stop_all().await;

        assert_eq!(set.len(), 0);
        for conn in conns {
            let outcome = conn.outcome().unwrap();
            assert_eq!(outcome.code, CloseCode::Shutdown);
            assert!(outcome.reason.contains("Shutdown"));
        }
    }

    #[tokio::test]
    async fn test_self_closing_connection_is_pruned() {
        let set = ConnectionSet::new();
        let conn = spawn_connection();
        set.insert(conn.clone());

        conn.close(CloseCode::Normal, "bye").unwrap();
        conn.on_transport_eof();
        conn.closed().await;

        // The watcher task runs after delivery; give it a turn.
        tokio::task::yield_now().await;
        assert_eq!(set.len(), 0);
    }

    #[tokio::test]
    async fn test_stop_all_with_already_closed_member() {
        let set = ConnectionSet::new();
        let conn = spawn_connection();
        set.insert(conn.clone());
        conn.force_shutdown("Shutdown");
        conn.closed().await;

        set.stop_all().await;
        assert_eq!(set.len(), 0);
    }
}
