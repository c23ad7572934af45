use crate::domain::{CardColor, OutboundEvent, PlayerId};
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{LobbyEvent, LobbyHandle, LobbyRegistry};

use axum::{
    Error,
    body::Bytes,
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{MissedTickBehavior, timeout};
use tracing::{Instrument, debug, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    LobbyClosed,
    LobbyNotFound,
    UnknownPlayer,
    JoinRequired,
    JoinTimeout,
    ClosedBeforeJoin,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_USERNAME_LEN: usize = 32;
const MAX_LOBBY_CODE_LEN: usize = 64;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
// Retries for the lookup-then-send race against a lobby tearing down.
const JOIN_ATTEMPTS: usize = 4;
const OUTBOX_CAPACITY: usize = 64;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        // Separate connection id for correlating logs before/after a
        // player_id exists.
        let conn_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("conn", %conn_id, player_id = tracing::field::Empty);
        handle_socket(socket, state).instrument(span)
    })
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut ctx = match bootstrap_connection(&mut socket, &state).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(e) => {
            warn!(error = ?e, "failed to bootstrap connection");
            let _ = socket.close().await;
            return;
        }
    };

    tracing::Span::current().record("player_id", ctx.player_id.as_str());
    info!(lobby_code = %ctx.lobby_code, "client connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

struct ConnCtx {
    pub player_id: PlayerId,
    // Link epoch handed out at bind time; presented with the disconnect so
    // the session can tell this socket from one that replaced it.
    pub epoch: u64,
    // Lobby code this connection is attached to.
    pub lobby_code: Arc<str>,
    pub input_tx: mpsc::Sender<LobbyEvent>,
    // Events the session addressed to this player.
    pub outbox_rx: mpsc::Receiver<OutboundEvent>,
    pub ping_interval: Duration,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,

    pub last_event_full_log: Instant,
    pub last_invalid_json_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

#[derive(Debug)]
enum Handshake {
    Join {
        username: String,
        lobby_code: String,
    },
    Reconnect {
        lobby_code: String,
        player_id: PlayerId,
    },
}

async fn bootstrap_connection(socket: &mut WebSocket, state: &AppState) -> Result<ConnCtx, NetError> {
    // The very first meaningful client message must name a lobby.
    let handshake = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    let (outbox_tx, outbox_rx) = mpsc::channel::<OutboundEvent>(OUTBOX_CAPACITY);

    let (handle, player_id, epoch) = match handshake {
        Handshake::Join {
            username,
            lobby_code,
        } => join_lobby(&state.lobbies, &lobby_code, username, &outbox_tx, socket).await?,
        Handshake::Reconnect {
            lobby_code,
            player_id,
        } => {
            let (handle, epoch) =
                reconnect_lobby(&state.lobbies, &lobby_code, &player_id, &outbox_tx, socket)
                    .await?;
            (handle, player_id, epoch)
        }
    };

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id,
        epoch,
        lobby_code: handle.lobby_code.clone(),
        input_tx: handle.input_tx.clone(),
        outbox_rx,
        ping_interval: state.ping_interval,

        msgs_in: 1,
        msgs_out: 0,
        bytes_in: 0,
        bytes_out: 0,

        invalid_json: 0,

        last_event_full_log: now,
        last_invalid_json_log: now,

        close_frame: None,
    })
}

async fn read_handshake(socket: &mut WebSocket) -> Result<Handshake, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                return match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => {
                        let username = payload.username.trim();
                        if username.is_empty()
                            || username.len() > MAX_USERNAME_LEN
                            || payload.lobby_code.is_empty()
                            || payload.lobby_code.len() > MAX_LOBBY_CODE_LEN
                        {
                            let _ = send_close_with_reason(
                                socket,
                                close_code::POLICY,
                                "invalid join payload",
                            )
                            .await;
                            return Err(NetError::JoinRequired);
                        }
                        Ok(Handshake::Join {
                            username: username.to_string(),
                            lobby_code: payload.lobby_code,
                        })
                    }
                    Ok(ClientMessage::Reconnect(payload)) => {
                        if payload.player_id.is_empty()
                            || payload.lobby_code.is_empty()
                            || payload.lobby_code.len() > MAX_LOBBY_CODE_LEN
                        {
                            let _ = send_close_with_reason(
                                socket,
                                close_code::POLICY,
                                "invalid reconnect payload",
                            )
                            .await;
                            return Err(NetError::JoinRequired);
                        }
                        Ok(Handshake::Reconnect {
                            lobby_code: payload.lobby_code,
                            player_id: PlayerId::from_token(&payload.player_id),
                        })
                    }
                    Ok(_) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        Err(NetError::JoinRequired)
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        Err(NetError::JoinRequired)
                    }
                };
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

async fn join_lobby(
    lobbies: &Arc<LobbyRegistry>,
    lobby_code: &str,
    username: String,
    outbox_tx: &mpsc::Sender<OutboundEvent>,
    socket: &mut WebSocket,
) -> Result<(LobbyHandle, PlayerId, u64), NetError> {
    // A lobby can empty out and tear down between lookup and send; retry
    // against a fresh handle until the join lands.
    for _ in 0..JOIN_ATTEMPTS {
        let handle = lobbies.join_or_create(lobby_code).await;
        let (reply_tx, reply_rx) = oneshot::channel();
        let event = LobbyEvent::Join {
            username: username.clone(),
            outbox: outbox_tx.clone(),
            reply: reply_tx,
        };
        if handle.input_tx.send(event).await.is_err() {
            continue;
        }
        match reply_rx.await {
            Ok((player_id, epoch)) => {
                // The join may have been re-routed to a replacement lobby
                // under the same code; prefer the handle now registered.
                let handle = lobbies.get(lobby_code).await.unwrap_or(handle);
                return Ok((handle, player_id, epoch));
            }
            Err(_) => continue,
        }
    }

    warn!(lobby_code, "giving up on join after repeated lobby teardowns");
    let _ = send_close_with_reason(socket, close_code::AGAIN, "lobby unavailable").await;
    Err(NetError::LobbyClosed)
}

async fn reconnect_lobby(
    lobbies: &Arc<LobbyRegistry>,
    lobby_code: &str,
    player_id: &PlayerId,
    outbox_tx: &mpsc::Sender<OutboundEvent>,
    socket: &mut WebSocket,
) -> Result<(LobbyHandle, u64), NetError> {
    // Reconnect never creates a lobby; an expired one means the identity is gone.
    let Some(handle) = lobbies.get(lobby_code).await else {
        let _ = send_close_with_reason(socket, close_code::POLICY, "unknown lobby").await;
        return Err(NetError::LobbyNotFound);
    };

    let (reply_tx, reply_rx) = oneshot::channel();
    let event = LobbyEvent::Reconnect {
        player_id: player_id.clone(),
        outbox: outbox_tx.clone(),
        reply: reply_tx,
    };
    if handle.input_tx.send(event).await.is_err() {
        let _ = send_close_with_reason(socket, close_code::AGAIN, "lobby unavailable").await;
        return Err(NetError::LobbyClosed);
    }

    match reply_rx.await {
        Ok(Some(epoch)) => Ok((handle, epoch)),
        Ok(None) | Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "unknown player").await;
            Err(NetError::UnknownPlayer)
        }
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id.clone();

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        epoch,
        input_tx,
        outbox_rx,
        ping_interval,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        last_event_full_log,
        last_invalid_json_log,
        close_frame,
        ..
    } = ctx;

    let mut ping = tokio::time::interval(*ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Peers that neither talk nor pong for two intervals are considered gone.
    let idle_limit = *ping_interval * 2;
    let mut last_heard = Instant::now();

    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming message from the client.
            incoming = socket.recv() => {
                if incoming.is_some() {
                    last_heard = Instant::now();
                }
                match handle_incoming_ws(
                    incoming,
                    &player_id,
                    input_tx,
                    msgs_in,
                    bytes_in,
                    invalid_json,
                    last_event_full_log,
                    last_invalid_json_log,
                    close_frame,
                ) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing event from the lobby session.
            outbound = outbox_rx.recv() => {
                match outbound {
                    Some(event) => {
                        let msg = ServerMessage::from(event);
                        match send_message(socket, &msg).await {
                            Ok(bytes) => {
                                *msgs_out += 1;
                                *bytes_out += bytes as u64;
                                false
                            }
                            Err(err) => {
                                warn!(error = ?err, "failed to send lobby event");
                                true
                            }
                        }
                    }
                    None => {
                        // The session dropped this connection's outbox: the
                        // player was removed or the lobby shut down.
                        *close_frame = Some(CloseFrame {
                            code: close_code::NORMAL,
                            reason: "lobby closed".into(),
                        });
                        true
                    }
                }
            }

            // Liveness ping.
            _ = ping.tick() => {
                if last_heard.elapsed() > idle_limit {
                    info!(player_id = player_id.as_str(), "peer silent past idle limit");
                    true
                } else {
                    socket.send(Message::Ping(Bytes::new())).await.is_err()
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    // Tell the lobby the socket is gone; the grace timer takes it from here.
    // A closed channel just means the lobby already tore down.
    if input_tx
        .send(LobbyEvent::Disconnected {
            player_id: player_id.clone(),
            epoch: *epoch,
        })
        .await
        .is_err()
    {
        debug!(player_id = player_id.as_str(), "lobby already closed at disconnect");
    }

    debug!(
        player_id = player_id.as_str(),
        msgs_in = *msgs_in,
        msgs_out = *msgs_out,
        bytes_in = *bytes_in,
        bytes_out = *bytes_out,
        invalid_json = *invalid_json,
        "connection stats"
    );
    info!(player_id = player_id.as_str(), "client disconnected");

    if let Some(err) = fatal { Err(err) } else { Ok(()) }
}

#[allow(clippy::too_many_arguments)]
fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    player_id: &PlayerId,
    input_tx: &mpsc::Sender<LobbyEvent>,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    invalid_json: &mut u32,
    last_event_full_log: &mut Instant,
    last_invalid_json_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => {
                        let Some(event) =
                            translate_message(player_id, message, last_invalid_json_log)
                        else {
                            return Ok(LoopControl::Continue);
                        };
                        forward_event(input_tx, event, player_id, last_event_full_log)
                    }
                    Err(parse_err) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_json_log) {
                            warn!(
                                player_id = player_id.as_str(),
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(player_id = player_id.as_str(), error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id = player_id.as_str(), "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

/// Maps a post-handshake client message onto a lobby event. Returns `None`
/// for messages that are dropped at the boundary.
fn translate_message(
    player_id: &PlayerId,
    message: ClientMessage,
    last_invalid_json_log: &mut Instant,
) -> Option<LobbyEvent> {
    match message {
        ClientMessage::Join(_) | ClientMessage::Reconnect(_) => {
            // Handshake packets after bootstrap are ignored to keep the
            // session stable.
            if should_log(last_invalid_json_log) {
                warn!(player_id = player_id.as_str(), "duplicate handshake ignored");
            }
            None
        }
        ClientMessage::CardPlaced { card } => Some(LobbyEvent::CardPlaced {
            player_id: player_id.clone(),
            card_id: card.id,
        }),
        ClientMessage::DrawRequest => Some(LobbyEvent::DrawRequest {
            player_id: player_id.clone(),
        }),
        ClientMessage::ColorWish { color } => {
            let color = match color {
                None => None,
                Some(code) => match CardColor::from_code(&code) {
                    Some(color) => Some(color),
                    None => {
                        // An unknown color code is dropped entirely; the wish
                        // stays pending rather than being forfeited.
                        if should_log(last_invalid_json_log) {
                            warn!(
                                player_id = player_id.as_str(),
                                code, "unknown wish color dropped"
                            );
                        }
                        return None;
                    }
                },
            };
            Some(LobbyEvent::ColorWish {
                player_id: player_id.clone(),
                color,
            })
        }
        ClientMessage::SettingsChanged { settings } => Some(LobbyEvent::SettingsChanged {
            player_id: player_id.clone(),
            update: (&settings).into(),
        }),
        ClientMessage::StartGame => Some(LobbyEvent::StartGame {
            player_id: player_id.clone(),
        }),
    }
}

fn forward_event(
    input_tx: &mpsc::Sender<LobbyEvent>,
    event: LobbyEvent,
    player_id: &PlayerId,
    last_event_full_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    match input_tx.try_send(event) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(last_event_full_log) {
                warn!(
                    player_id = player_id.as_str(),
                    "lobby channel full; dropping message"
                );
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::LobbyClosed),
    }
}
