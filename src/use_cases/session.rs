// Per-lobby session actor. Owns the Game, consumes inbound events in
// arrival order, routes outbound events to per-player outboxes and runs the
// reconnect grace timers. Everything inside a lobby is single-threaded by
// construction, so the rules never need a lock.

use crate::domain::{Game, OutboundEvent, PlayerId, Recipient};
use crate::use_cases::lobby::LobbyRegistry;
use crate::use_cases::types::LobbyEvent;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Connection binding for one roster member. The epoch is bumped on every
/// connect/disconnect transition; a scheduled removal fires only if its
/// epoch is still current, which is how a reconnect cancels it.
struct Link {
    tx: mpsc::Sender<OutboundEvent>,
    connected: bool,
    epoch: u64,
}

pub async fn session_task(
    lobby_code: String,
    mut input_rx: mpsc::Receiver<LobbyEvent>,
    self_tx: mpsc::Sender<LobbyEvent>,
    registry: Arc<LobbyRegistry>,
    instance: u64,
) {
    let grace = registry.settings().reconnect_grace;
    let mut game = Game::new(lobby_code.clone());
    let mut links: HashMap<PlayerId, Link> = HashMap::new();

    info!(lobby = %lobby_code, "lobby created");

    while let Some(event) = input_rx.recv().await {
        match event {
            LobbyEvent::Join {
                username,
                outbox,
                reply,
            } => {
                let player_id = game.join(username.clone());
                info!(lobby = %lobby_code, player = %player_id, %username, "player joined");
                links.insert(
                    player_id.clone(),
                    Link {
                        tx: outbox,
                        connected: true,
                        epoch: 0,
                    },
                );
                let _ = reply.send((player_id, 0));
            }
            LobbyEvent::Reconnect {
                player_id,
                outbox,
                reply,
            } => {
                if game.has_player(&player_id) {
                    let link = links.entry(player_id.clone()).or_insert(Link {
                        tx: outbox.clone(),
                        connected: false,
                        epoch: 0,
                    });
                    link.tx = outbox;
                    link.connected = true;
                    // The bump invalidates any pending grace timer and any
                    // close still owed by the replaced socket.
                    link.epoch += 1;
                    let _ = reply.send(Some(link.epoch));
                    info!(lobby = %lobby_code, player = %player_id, "player reconnected");
                    game.resync(&player_id);
                } else {
                    debug!(lobby = %lobby_code, player = %player_id, "reconnect for unknown identity");
                    let _ = reply.send(None);
                }
            }
            LobbyEvent::CardPlaced { player_id, card_id } => {
                game.place_card(&player_id, card_id);
            }
            LobbyEvent::DrawRequest { player_id } => {
                game.draw_cards(&player_id);
            }
            LobbyEvent::ColorWish { player_id, color } => {
                game.color_wished(&player_id, color);
            }
            LobbyEvent::SettingsChanged { player_id, update } => {
                game.update_settings(&player_id, &update);
            }
            LobbyEvent::StartGame { player_id } => {
                game.start(&player_id);
                if game.started() {
                    info!(lobby = %lobby_code, "game started");
                }
            }
            LobbyEvent::Disconnected { player_id, epoch } => {
                if let Some(link) = links.get_mut(&player_id) {
                    // A reconnect may land before the replaced socket's close
                    // does; that close carries a stale epoch and must not
                    // touch the rebound link.
                    if link.epoch != epoch {
                        debug!(lobby = %lobby_code, player = %player_id, "stale disconnect ignored");
                        continue;
                    }
                    link.connected = false;
                    link.epoch += 1;
                    if grace.is_zero() {
                        links.remove(&player_id);
                        game.leave(&player_id);
                        info!(lobby = %lobby_code, player = %player_id, "player left");
                    } else {
                        let epoch = link.epoch;
                        let expiry_tx = self_tx.clone();
                        let expired = player_id.clone();
                        debug!(
                            lobby = %lobby_code,
                            player = %player_id,
                            grace_ms = grace.as_millis() as u64,
                            "reconnect window opened"
                        );
                        tokio::spawn(async move {
                            tokio::time::sleep(grace).await;
                            let _ = expiry_tx
                                .send(LobbyEvent::LeaveExpired {
                                    player_id: expired,
                                    epoch,
                                })
                                .await;
                        });
                    }
                }
            }
            LobbyEvent::LeaveExpired { player_id, epoch } => {
                let current = links
                    .get(&player_id)
                    .is_some_and(|link| !link.connected && link.epoch == epoch);
                if current {
                    links.remove(&player_id);
                    game.leave(&player_id);
                    info!(lobby = %lobby_code, player = %player_id, "reconnect window expired");
                }
            }
        }

        deliver(&mut game, &links);

        if game.is_empty() {
            let removed = registry.remove(&lobby_code, instance).await;
            info!(lobby = %lobby_code, removed, "lobby empty; shutting down");
            reroute_buffered_joins(&mut input_rx, &registry, &lobby_code).await;
            break;
        }
    }
}

/// Drains the game's queued events into the connected outboxes.
/// Delivery is fire-and-forget: a full or closed outbox is skipped so one
/// dead client never blocks the rest of the lobby.
fn deliver(game: &mut Game, links: &HashMap<PlayerId, Link>) {
    for envelope in game.take_events() {
        match envelope.to {
            Recipient::All => {
                for link in links.values().filter(|l| l.connected) {
                    if link.tx.try_send(envelope.event.clone()).is_err() {
                        debug!("dropping event for saturated connection");
                    }
                }
            }
            Recipient::One(player_id) => {
                if let Some(link) = links.get(&player_id).filter(|l| l.connected) {
                    if link.tx.try_send(envelope.event).is_err() {
                        debug!(player = %player_id, "dropping event for saturated connection");
                    }
                }
            }
        }
    }
}

/// Joins that raced the teardown would otherwise be lost with the channel;
/// hand them to a fresh lobby under the same code.
async fn reroute_buffered_joins(
    input_rx: &mut mpsc::Receiver<LobbyEvent>,
    registry: &Arc<LobbyRegistry>,
    lobby_code: &str,
) {
    input_rx.close();
    while let Ok(event) = input_rx.try_recv() {
        if matches!(event, LobbyEvent::Join { .. }) {
            let handle = registry.join_or_create(lobby_code).await;
            if handle.input_tx.send(event).await.is_err() {
                warn!(lobby = %lobby_code, "failed to re-route join during teardown");
            }
        }
    }
}
