//! Per-connection handler: authentication and command routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Resolve the session: the `sessionid` upgrade header if present,
//!      otherwise a `handshake` first message
//!   2. Send `handshakeAck` and register the [`SessionContext`]
//!   3. Loop: decode client events → coordinator; forward room events
//!      from the broadcaster back to the socket
//!
//! With an idle timeout configured, traffic in either direction keeps the
//! connection open.

use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use raidforge_protocol::{
    ClientMessage, Codec, PROTOCOL_VERSION, ProtocolError, ServerMessage, UserId,
};
use raidforge_session::{SessionContext, SessionStore};
use raidforge_store::KvStore;
use raidforge_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::{Instant, Sleep};

use crate::RaidError;
use crate::broadcast::OutboundSender;
use crate::catalog::UserCatalog;
use crate::reward::LedgerService;
use crate::server::ServerState;

/// How long a client without a `sessionid` header has to authenticate.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Drop guard that releases a connection's session when the handler
/// exits, panics included.
///
/// When the connection was the user's last one, the user also leaves
/// whatever room they were in. `Drop` is synchronous, so the cleanup
/// runs in a spawned task.
struct SessionGuard<S, U, L, A>
where
    S: KvStore + Clone,
    U: UserCatalog,
    L: LedgerService,
    A: SessionStore,
{
    ctx: SessionContext,
    state: Arc<ServerState<S, U, L, A>>,
}

impl<S, U, L, A> Drop for SessionGuard<S, U, L, A>
where
    S: KvStore + Clone,
    U: UserCatalog,
    L: LedgerService,
    A: SessionStore,
{
    fn drop(&mut self) {
        let connection_id = self.ctx.connection_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.coordinator.broadcaster().unsubscribe_all(connection_id);
            let (removed, remaining) = {
                let mut sessions = state.sessions.lock().await;
                let removed = sessions.unregister(connection_id);
                (removed, sessions.len())
            };
            let Some(removed) = removed else {
                return;
            };
            tracing::debug!(%connection_id, connections = remaining, "connection released");
            if !removed.was_last {
                return;
            }
            if let Err(e) = state.coordinator.disconnect(&removed.context).await {
                tracing::warn!(
                    %connection_id,
                    user_id = %removed.context.user_id,
                    error = %e,
                    "implicit leave on disconnect failed"
                );
            }
        });
    }
}

enum Flow {
    Continue,
    Close,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, U, L, A>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, U, L, A>>,
) -> Result<(), RaidError>
where
    S: KvStore + Clone,
    U: UserCatalog,
    L: LedgerService,
    A: SessionStore,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let user_id = match authenticate(&conn, &state).await {
        Ok(user_id) => user_id,
        Err(e) => {
            let _ = conn.close().await;
            return Err(e);
        }
    };
    send(
        &conn,
        &state,
        &ServerMessage::HandshakeAck {
            user_id,
            server_time: unix_millis(),
        },
    )
    .await?;
    let ctx = SessionContext::new(conn_id, user_id);
    let open = {
        let mut sessions = state.sessions.lock().await;
        sessions.register(ctx.clone())?;
        sessions.connections_of(user_id).len()
    };
    tracing::info!(%conn_id, %user_id, open, "user authenticated");
    let _guard = SessionGuard {
        ctx: ctx.clone(),
        state: Arc::clone(&state),
    };

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let idle_timeout = state.idle_timeout;
    let idle = tokio::time::sleep(idle_timeout.unwrap_or(Duration::MAX));
    tokio::pin!(idle);
    let touch = |idle: Pin<&mut Sleep>| {
        if let Some(timeout) = idle_timeout {
            idle.reset(Instant::now() + timeout);
        }
    };

    loop {
        tokio::select! {
            frame = conn.recv() => {
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%user_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%user_id, error = %e, "recv error");
                        break;
                    }
                };
                touch(idle.as_mut());

                let msg: ClientMessage = match state.codec.decode(&data) {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::debug!(%user_id, error = %e, "failed to decode event");
                        send_error(&conn, &state, 400, &e.to_string(), None).await?;
                        continue;
                    }
                };
                if let Flow::Close =
                    dispatch(&conn, &state, &ctx, &outbound_tx, msg).await?
                {
                    break;
                }
            }
            Some(event) = outbound_rx.recv() => {
                send(&conn, &state, &event).await?;
                touch(idle.as_mut());
            }
            () = &mut idle, if idle_timeout.is_some() => {
                tracing::info!(%user_id, "connection idle, closing");
                break;
            }
        }
    }

    let _ = conn.close().await;
    // _guard drops here → session cleanup fires.
    Ok(())
}

/// Resolves the connection's user from the upgrade header or a
/// `handshake` first message. Replies with an `error` before failing.
async fn authenticate<S, U, L, A>(
    conn: &WebSocketConnection,
    state: &ServerState<S, U, L, A>,
) -> Result<UserId, RaidError>
where
    A: SessionStore,
{
    let token = match conn.session_hint() {
        Some(token) => token.to_owned(),
        None => match read_handshake(conn, state).await {
            Ok(token) => token,
            Err(e) => {
                send_error(conn, state, e.code(), &e.to_string(), Some("handshake"))
                    .await?;
                return Err(e);
            }
        },
    };

    match state.session_store.resolve_session(&token).await {
        Ok(user_id) => Ok(user_id),
        Err(e) => {
            let err = RaidError::from(e);
            send_error(conn, state, err.code(), &err.to_string(), Some("handshake"))
                .await?;
            Err(err)
        }
    }
}

/// Waits for a `handshake` event and returns its session id.
async fn read_handshake<S, U, L, A>(
    conn: &WebSocketConnection,
    state: &ServerState<S, U, L, A>,
) -> Result<String, RaidError> {
    let data = match tokio::time::timeout(HANDSHAKE_TIMEOUT, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(
                ProtocolError::InvalidMessage("handshake timed out".into()).into()
            );
        }
    };

    match state.codec.decode::<ClientMessage>(&data)? {
        ClientMessage::Handshake {
            version,
            session_id,
        } => {
            if version != PROTOCOL_VERSION {
                return Err(ProtocolError::InvalidMessage(format!(
                    "version mismatch: expected {PROTOCOL_VERSION}, got {version}"
                ))
                .into());
            }
            Ok(session_id)
        }
        other => Err(ProtocolError::InvalidMessage(format!(
            "first event must be handshake, got {}",
            other.name()
        ))
        .into()),
    }
}

/// Routes one client event. Rejections are reported to this connection
/// only; they never end the loop.
async fn dispatch<S, U, L, A>(
    conn: &WebSocketConnection,
    state: &ServerState<S, U, L, A>,
    ctx: &SessionContext,
    outbound: &OutboundSender,
    msg: ClientMessage,
) -> Result<Flow, RaidError>
where
    S: KvStore + Clone,
    U: UserCatalog,
    L: LedgerService,
    A: SessionStore,
{
    let event = msg.name();
    let coordinator = &state.coordinator;
    let result = match msg {
        ClientMessage::Handshake { .. } => {
            let ack = ServerMessage::HandshakeAck {
                user_id: ctx.user_id,
                server_time: unix_millis(),
            };
            send(conn, state, &ack).await?;
            Ok(())
        }
        ClientMessage::Heartbeat { client_time } => {
            let ack = ServerMessage::HeartbeatAck {
                client_time,
                server_time: unix_millis(),
            };
            send(conn, state, &ack).await?;
            Ok(())
        }
        ClientMessage::CreateRoom {
            boss_id,
            my_pokemon_id,
        } => coordinator
            .create_room(ctx, boss_id, my_pokemon_id, outbound.clone())
            .await
            .map(drop),
        ClientMessage::JoinRoom {
            room_id,
            my_pokemon_id,
        } => coordinator
            .join_room(ctx, &room_id, my_pokemon_id, outbound.clone())
            .await
            .map(drop),
        ClientMessage::LeaveRoom { room_id } => {
            coordinator.leave_room(ctx, &room_id).await
        }
        ClientMessage::StartRaid { room_id } => {
            coordinator.start_raid(ctx, &room_id).await.map(drop)
        }
        ClientMessage::Action { room_id, skill_id } => {
            coordinator.action(ctx, &room_id, skill_id).await.map(drop)
        }
        ClientMessage::Disconnect { reason } => {
            tracing::info!(user_id = %ctx.user_id, %reason, "client disconnected");
            return Ok(Flow::Close);
        }
    };

    if let Err(e) = result {
        send_error(conn, state, e.code(), &e.to_string(), Some(event)).await?;
    }
    Ok(Flow::Continue)
}

/// Encodes a server event and writes it as a text frame.
async fn send<S, U, L, A>(
    conn: &WebSocketConnection,
    state: &ServerState<S, U, L, A>,
    msg: &ServerMessage,
) -> Result<(), RaidError> {
    let bytes = state.codec.encode(msg)?;
    match std::str::from_utf8(&bytes) {
        Ok(text) => conn.send_text(text).await?,
        Err(_) => conn.send(&bytes).await?,
    }
    Ok(())
}

async fn send_error<S, U, L, A>(
    conn: &WebSocketConnection,
    state: &ServerState<S, U, L, A>,
    code: u16,
    message: &str,
    event: Option<&str>,
) -> Result<(), RaidError> {
    let msg = ServerMessage::Error {
        code,
        message: message.to_string(),
        event: event.map(str::to_string),
    };
    send(conn, state, &msg).await
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
