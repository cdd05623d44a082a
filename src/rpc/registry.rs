use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use super::media::MediaSnapshot;
use super::methods::NEGOTIATE_METHODS;

/// Transport-assigned connection identifier.
pub type ConnectionId = u64;

/// Direction of a negotiated method set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    AppToTerminal,
    TerminalToApp,
}

/// Per-connection protocol state.
#[derive(Debug, Clone, Default)]
pub struct ConnectionData {
    pub op_app: bool,
    pub app_to_terminal: HashSet<String>,
    pub terminal_to_app: HashSet<String>,
    pub subscriptions: HashSet<String>,
    pub intent_count: u64,
    pub media: MediaSnapshot,
    pub voice_ready: bool,
}

impl ConnectionData {
    fn new(op_app: bool) -> Self {
        let mut data = Self {
            op_app,
            ..Default::default()
        };
        data.app_to_terminal.insert(NEGOTIATE_METHODS.to_owned());
        data
    }

    pub fn negotiated(&self, direction: Direction) -> &HashSet<String> {
        match direction {
            Direction::AppToTerminal => &self.app_to_terminal,
            Direction::TerminalToApp => &self.terminal_to_app,
        }
    }

    fn negotiated_mut(&mut self, direction: Direction) -> &mut HashSet<String> {
        match direction {
            Direction::AppToTerminal => &mut self.app_to_terminal,
            Direction::TerminalToApp => &mut self.terminal_to_app,
        }
    }
}

/// Thread-safe map of live connections.
///
/// One lock covers the whole map. Closures passed to [`Self::select`] run
/// under it and must not call out.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<HashMap<ConnectionId, ConnectionData>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection with fresh state. Re-creating an existing id
    /// resets it.
    pub fn create(&self, id: ConnectionId, op_app: bool) {
        self.inner.lock().insert(id, ConnectionData::new(op_app));
    }

    /// Returns true if the connection existed.
    pub fn destroy(&self, id: ConnectionId) -> bool {
        self.inner.lock().remove(&id).is_some()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.inner.lock().contains_key(&id)
    }

    /// Snapshot of all connection ids, ascending.
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.inner.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Clone of a connection's state.
    pub fn get(&self, id: ConnectionId) -> Option<ConnectionData> {
        self.inner.lock().get(&id).cloned()
    }

    pub fn is_op_app(&self, id: ConnectionId) -> bool {
        self.read(id, |c| c.op_app).unwrap_or_default()
    }

    pub fn add_negotiated(&self, id: ConnectionId, direction: Direction, method: &str) {
        self.write(id, |c| {
            c.negotiated_mut(direction).insert(method.to_owned());
        });
    }

    pub fn is_negotiated(&self, id: ConnectionId, direction: Direction, method: &str) -> bool {
        self.read(id, |c| c.negotiated(direction).contains(method))
            .unwrap_or_default()
    }

    pub fn negotiated(&self, id: ConnectionId, direction: Direction) -> HashSet<String> {
        self.read(id, |c| c.negotiated(direction).clone())
            .unwrap_or_default()
    }

    pub fn subscribe(&self, id: ConnectionId, topic: &str) {
        self.write(id, |c| {
            c.subscriptions.insert(topic.to_owned());
        });
    }

    /// Removing a topic that was never subscribed is a no-op.
    pub fn unsubscribe(&self, id: ConnectionId, topic: &str) {
        self.write(id, |c| {
            c.subscriptions.remove(topic);
        });
    }

    pub fn subscriptions(&self, id: ConnectionId) -> HashSet<String> {
        self.read(id, |c| c.subscriptions.clone()).unwrap_or_default()
    }

    /// Bump the connection's intent counter and return `IntentId<N>`.
    pub fn next_intent_id(&self, id: ConnectionId) -> Option<String> {
        self.write(id, |c| {
            c.intent_count += 1;
            format!("IntentId{}", c.intent_count)
        })
    }

    pub fn set_media(&self, id: ConnectionId, media: MediaSnapshot) {
        self.write(id, |c| c.media = media);
    }

    pub fn media(&self, id: ConnectionId) -> MediaSnapshot {
        self.read(id, |c| c.media.clone()).unwrap_or_default()
    }

    pub fn set_voice_ready(&self, id: ConnectionId, ready: bool) {
        self.write(id, |c| c.voice_ready = ready);
    }

    pub fn voice_ready(&self, id: ConnectionId) -> bool {
        self.read(id, |c| c.voice_ready).unwrap_or_default()
    }

    /// Ids of every connection matching `pred`, ascending, evaluated in one
    /// pass under the lock.
    pub fn select(&self, mut pred: impl FnMut(ConnectionId, &ConnectionData) -> bool) -> Vec<ConnectionId> {
        let inner = self.inner.lock();
        let mut ids: Vec<_> = inner
            .iter()
            .filter(|(id, data)| pred(**id, data))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn read<R>(&self, id: ConnectionId, f: impl FnOnce(&ConnectionData) -> R) -> Option<R> {
        let inner = self.inner.lock();
        match inner.get(&id) {
            Some(data) => Some(f(data)),
            None => {
                warn!(connection_id = id, "connection data lost");
                None
            }
        }
    }

    fn write<R>(&self, id: ConnectionId, f: impl FnOnce(&mut ConnectionData) -> R) -> Option<R> {
        let mut inner = self.inner.lock();
        match inner.get_mut(&id) {
            Some(data) => Some(f(data)),
            None => {
                warn!(connection_id = id, "connection data lost");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::methods::{NOTIFY, SUBSCRIBE};

    #[test]
    fn create_seeds_negotiate_methods() {
        let reg = ConnectionRegistry::new();
        reg.create(1, false);
        let set = reg.negotiated(1, Direction::AppToTerminal);
        assert_eq!(set.len(), 1);
        assert!(set.contains(NEGOTIATE_METHODS));
        assert!(reg.negotiated(1, Direction::TerminalToApp).is_empty());
    }

    #[test]
    fn recreate_resets_state() {
        let reg = ConnectionRegistry::new();
        reg.create(1, false);
        reg.add_negotiated(1, Direction::AppToTerminal, SUBSCRIBE);
        reg.subscribe(1, "subtitlesPrefChange");
        reg.next_intent_id(1);
        reg.create(1, true);
        let data = reg.get(1).unwrap();
        assert!(data.op_app);
        assert!(data.subscriptions.is_empty());
        assert_eq!(data.intent_count, 0);
        assert!(!data.app_to_terminal.contains(SUBSCRIBE));
    }

    #[test]
    fn duplicates_collapse() {
        let reg = ConnectionRegistry::new();
        reg.create(1, false);
        reg.add_negotiated(1, Direction::TerminalToApp, NOTIFY);
        reg.add_negotiated(1, Direction::TerminalToApp, NOTIFY);
        assert_eq!(reg.negotiated(1, Direction::TerminalToApp).len(), 1);
    }

    #[test]
    fn subscribe_then_unsubscribe_restores_set() {
        let reg = ConnectionRegistry::new();
        reg.create(1, false);
        reg.subscribe(1, "uiMagnifierPrefChange");
        let before = reg.subscriptions(1);
        reg.subscribe(1, "subtitlesPrefChange");
        reg.unsubscribe(1, "subtitlesPrefChange");
        assert_eq!(reg.subscriptions(1), before);
        reg.unsubscribe(1, "screenReaderPrefChange");
        assert_eq!(reg.subscriptions(1), before);
    }

    #[test]
    fn intent_ids_increase_per_connection() {
        let reg = ConnectionRegistry::new();
        reg.create(1, false);
        reg.create(2, false);
        assert_eq!(reg.next_intent_id(1).as_deref(), Some("IntentId1"));
        assert_eq!(reg.next_intent_id(1).as_deref(), Some("IntentId2"));
        assert_eq!(reg.next_intent_id(2).as_deref(), Some("IntentId1"));
    }

    #[test]
    fn unknown_connection_reads_defaults() {
        let reg = ConnectionRegistry::new();
        assert!(!reg.is_op_app(9));
        assert!(!reg.voice_ready(9));
        assert!(reg.subscriptions(9).is_empty());
        assert_eq!(reg.next_intent_id(9), None);
        assert_eq!(reg.media(9), MediaSnapshot::default());
        reg.subscribe(9, "subtitlesPrefChange");
        assert!(reg.get(9).is_none());
    }

    #[test]
    fn ids_snapshot_and_destroy() {
        let reg = ConnectionRegistry::new();
        reg.create(3, false);
        reg.create(1, false);
        assert_eq!(reg.connection_ids(), vec![1, 3]);
        assert!(reg.destroy(3));
        assert!(!reg.destroy(3));
        assert_eq!(reg.connection_ids(), vec![1]);
    }

    #[test]
    fn select_filters_under_one_lock() {
        let reg = ConnectionRegistry::new();
        reg.create(1, false);
        reg.create(2, false);
        reg.set_voice_ready(2, true);
        assert_eq!(reg.select(|_, c| c.voice_ready), vec![2]);
    }
}
