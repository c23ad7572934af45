// Lobby registry: maps lobby codes to running session tasks. Lobbies are
// created implicitly on first join and removed when their roster empties.

use crate::use_cases::session::session_task;
use crate::use_cases::types::LobbyEvent;
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};

/// Shared configuration applied to newly created lobbies.
#[derive(Debug, Clone)]
pub struct LobbySettings {
    /// Capacity for inbound lobby events.
    pub input_channel_capacity: usize,
    /// How long a disconnected player may reconnect before removal.
    /// Zero means immediate removal.
    pub reconnect_grace: Duration,
}

/// Per-lobby channel plus the instance token guarding its removal.
#[derive(Debug, Clone)]
pub struct LobbyHandle {
    /// Code clients use to target this lobby (opaque, case-sensitive).
    pub lobby_code: Arc<str>,
    /// Sender for events into the lobby session task.
    pub input_tx: mpsc::Sender<LobbyEvent>,
    instance: u64,
}

/// Thread-safe registry for active lobbies.
#[derive(Debug)]
pub struct LobbyRegistry {
    settings: LobbySettings,
    next_instance: AtomicU64,
    lobbies: RwLock<HashMap<String, LobbyHandle>>,
}

impl LobbyRegistry {
    pub fn new(settings: LobbySettings) -> Self {
        Self {
            settings,
            next_instance: AtomicU64::new(1),
            lobbies: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &LobbySettings {
        &self.settings
    }

    /// Returns the handle for `lobby_code`, spawning a fresh session task
    /// if the lobby does not exist yet. Insert-if-absent runs under the
    /// write lock, so two concurrent first joins share one lobby.
    ///
    /// Returns a boxed future to break the `Send` inference cycle with the
    /// session task, which awaits this method during teardown re-routing.
    pub fn join_or_create<'a>(
        self: &'a Arc<Self>,
        lobby_code: &'a str,
    ) -> futures::future::BoxFuture<'a, LobbyHandle> {
        async move {
            let mut lobbies = self.lobbies.write().await;
            if let Some(handle) = lobbies.get(lobby_code) {
                return handle.clone();
            }

            let (input_tx, input_rx) =
                mpsc::channel::<LobbyEvent>(self.settings.input_channel_capacity);
            let instance = self.next_instance.fetch_add(1, Ordering::Relaxed);
            let handle = LobbyHandle {
                lobby_code: Arc::from(lobby_code),
                input_tx: input_tx.clone(),
                instance,
            };

            // Boxed because the session awaits `join_or_create` during teardown
            // re-routing; spawning the opaque future directly would make the two
            // future types mutually recursive.
            tokio::spawn(
                session_task(
                    lobby_code.to_string(),
                    input_rx,
                    input_tx,
                    Arc::clone(self),
                    instance,
                )
                .boxed(),
            );

            lobbies.insert(lobby_code.to_string(), handle.clone());
            handle
        }
        .boxed()
    }

    /// Returns a lobby handle without creating one.
    pub async fn get(&self, lobby_code: &str) -> Option<LobbyHandle> {
        let lobbies = self.lobbies.read().await;
        lobbies.get(lobby_code).cloned()
    }

    /// Removes the lobby, but only if `instance` still owns the slot. A
    /// lobby re-created under the same code in the meantime is left alone,
    /// which makes delete-if-empty atomic with re-creation.
    pub async fn remove(&self, lobby_code: &str, instance: u64) -> bool {
        let mut lobbies = self.lobbies.write().await;
        if lobbies
            .get(lobby_code)
            .is_some_and(|h| h.instance == instance)
        {
            lobbies.remove(lobby_code);
            true
        } else {
            false
        }
    }

    pub async fn lobby_count(&self) -> usize {
        self.lobbies.read().await.len()
    }
}
