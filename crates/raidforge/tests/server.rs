//! Integration tests for the raid server, handler, and full connection flow.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use raidforge::{CoordinatorConfig, MemoryCatalog, MemoryLedger, RaidServerBuilder};
use raidforge_protocol::{
    Actor, BattleStatus, ClientMessage, EventType, PROTOCOL_VERSION, PokemonId,
    PokemonTemplate, RoomId, RoomSnapshot, ServerMessage, SkillId,
    SkillTemplate, TargetMode, UserId,
};
use raidforge_session::{MemorySessionStore, SessionConfig};
use raidforge_store::MemoryStore;
use raidforge_transport::SESSION_HEADER;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;

// =========================================================================
// Fixtures
// =========================================================================

const PIKACHU: PokemonId = PokemonId(25);
const MEWTWO: PokemonId = PokemonId(150);
const THUNDER: SkillId = SkillId(1);

fn catalog() -> MemoryCatalog {
    let pikachu = PokemonTemplate {
        id: PIKACHU,
        name: "Pikachu".into(),
        hp: 50,
        skills: vec![SkillTemplate {
            id: THUNDER,
            name: "Thunder".into(),
            damage: 30,
            target_mode: TargetMode::Single,
            max_uses: 10,
        }],
    };
    let mewtwo = PokemonTemplate {
        id: MEWTWO,
        name: "Mewtwo".into(),
        hp: 100,
        skills: vec![SkillTemplate {
            id: SkillId(9),
            name: "Psychic".into(),
            damage: 20,
            target_mode: TargetMode::Single,
            max_uses: 10,
        }],
    };
    let mut catalog = MemoryCatalog::new().with_template(pikachu).with_template(mewtwo);
    for user in 1..=5 {
        catalog = catalog.with_owned(UserId(user), PIKACHU);
    }
    catalog
}

struct TestServer {
    ws_addr: String,
    http_addr: String,
    ledger: Arc<MemoryLedger>,
}

/// Starts a server on random ports. Users 1 through 5 hold the tokens
/// `tok-1` .. `tok-5`.
async fn start_server() -> TestServer {
    start_server_with(None).await
}

async fn start_server_with(idle_timeout: Option<Duration>) -> TestServer {
    let sessions = Arc::new(MemorySessionStore::new(SessionConfig::default()));
    for user in 1..=5 {
        sessions.insert(format!("tok-{user}"), UserId(user)).await;
    }
    let ledger = Arc::new(MemoryLedger::new());

    let mut builder = RaidServerBuilder::new();
    if let Some(timeout) = idle_timeout {
        builder = builder.idle_timeout(timeout);
    }
    let server = builder
        .bind("127.0.0.1:0")
        .http(Some("127.0.0.1:0"))
        .coordinator_config(CoordinatorConfig {
            rng_seed: Some(7),
            ..CoordinatorConfig::default()
        })
        .build(MemoryStore::new(), catalog(), Arc::clone(&ledger), sessions)
        .await
        .expect("server should build");

    let ws_addr = server.local_addr().expect("local addr").to_string();
    let http_addr = server.http_addr().expect("http addr").to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    TestServer {
        ws_addr,
        http_addr,
        ledger,
    }
}

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

/// Connects with the `sessionid` header and consumes the ack.
async fn connect_as(addr: &str, user: u64) -> ClientWs {
    let mut request = format!("ws://{addr}")
        .into_client_request()
        .expect("valid request");
    request.headers_mut().insert(
        SESSION_HEADER,
        format!("tok-{user}").parse().expect("header value"),
    );
    let (mut ws, _) = tokio_tungstenite::connect_async(request)
        .await
        .expect("should connect");
    match recv(&mut ws).await {
        ServerMessage::HandshakeAck { user_id, .. } => {
            assert_eq!(user_id, UserId(user));
        }
        other => panic!("expected HandshakeAck, got {other:?}"),
    }
    ws
}

async fn send(ws: &mut ClientWs, msg: &ClientMessage) {
    let json = serde_json::to_string(msg).expect("encode");
    ws.send(Message::Text(json.into())).await.expect("send");
}

async fn recv(ws: &mut ClientWs) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .expect("recv");
        match frame {
            Message::Text(text) => {
                return serde_json::from_str(text.as_str()).expect("decode");
            }
            Message::Binary(bytes) => {
                return serde_json::from_slice(&bytes).expect("decode");
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame {other:?}"),
        }
    }
}

async fn recv_room_update(ws: &mut ClientWs) -> RoomSnapshot {
    match recv(ws).await {
        ServerMessage::RoomUpdate(snapshot) => snapshot,
        other => panic!("expected RoomUpdate, got {other:?}"),
    }
}

async fn expect_error(ws: &mut ClientWs, code: u16, event: &str) {
    match recv(ws).await {
        ServerMessage::Error {
            code: got,
            event: got_event,
            ..
        } => {
            assert_eq!(got, code);
            assert_eq!(got_event.as_deref(), Some(event));
        }
        other => panic!("expected Error {code}, got {other:?}"),
    }
}

/// User 1 creates a room; user 2 joins it. Both clients have consumed
/// every `roomUpdate` produced so far.
async fn room_of_two(addr: &str) -> (ClientWs, ClientWs, RoomId) {
    let mut leader = connect_as(addr, 1).await;
    send(
        &mut leader,
        &ClientMessage::CreateRoom {
            boss_id: MEWTWO,
            my_pokemon_id: PIKACHU,
        },
    )
    .await;
    let created = recv_room_update(&mut leader).await;
    assert_eq!(created.event_type, EventType::CreateRoom);
    let room_id = created.room_id;

    let mut guest = connect_as(addr, 2).await;
    send(
        &mut guest,
        &ClientMessage::JoinRoom {
            room_id: room_id.clone(),
            my_pokemon_id: PIKACHU,
        },
    )
    .await;
    recv_room_update(&mut leader).await;
    recv_room_update(&mut guest).await;
    (leader, guest, room_id)
}

/// Minimal HTTP/1.1 GET; returns status and body.
async fn http_get(addr: &str, path: &str, auth: Option<&str>) -> (u16, String) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("http connect");
    let mut request =
        format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    if let Some(token) = auth {
        request.push_str(&format!("Authorization: {token}\r\n"));
    }
    request.push_str("\r\n");
    stream.write_all(request.as_bytes()).await.expect("write");

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.expect("read");
    let status = raw
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .expect("status line");
    let body = raw
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}

// =========================================================================
// Handshake
// =========================================================================

#[tokio::test]
async fn test_session_header_authenticates_without_handshake() {
    let server = start_server().await;
    let _ws = connect_as(&server.ws_addr, 3).await;
}

#[tokio::test]
async fn test_handshake_event_authenticates() {
    let server = start_server().await;
    let mut ws = connect(&server.ws_addr).await;
    send(
        &mut ws,
        &ClientMessage::Handshake {
            version: PROTOCOL_VERSION,
            session_id: "tok-4".into(),
        },
    )
    .await;
    match recv(&mut ws).await {
        ServerMessage::HandshakeAck { user_id, .. } => {
            assert_eq!(user_id, UserId(4));
        }
        other => panic!("expected HandshakeAck, got {other:?}"),
    }
}

#[tokio::test]
async fn test_handshake_unknown_session_is_401() {
    let server = start_server().await;
    let mut ws = connect(&server.ws_addr).await;
    send(
        &mut ws,
        &ClientMessage::Handshake {
            version: PROTOCOL_VERSION,
            session_id: "nope".into(),
        },
    )
    .await;
    expect_error(&mut ws, 401, "handshake").await;
}

#[tokio::test]
async fn test_handshake_version_mismatch_is_400() {
    let server = start_server().await;
    let mut ws = connect(&server.ws_addr).await;
    send(
        &mut ws,
        &ClientMessage::Handshake {
            version: 999,
            session_id: "tok-1".into(),
        },
    )
    .await;
    expect_error(&mut ws, 400, "handshake").await;
}

#[tokio::test]
async fn test_command_before_handshake_is_rejected() {
    let server = start_server().await;
    let mut ws = connect(&server.ws_addr).await;
    send(
        &mut ws,
        &ClientMessage::StartRaid {
            room_id: RoomId::new("r"),
        },
    )
    .await;
    expect_error(&mut ws, 400, "handshake").await;
}

// =========================================================================
// Connection-level events
// =========================================================================

#[tokio::test]
async fn test_heartbeat_response() {
    let server = start_server().await;
    let mut ws = connect_as(&server.ws_addr, 1).await;
    send(&mut ws, &ClientMessage::Heartbeat { client_time: 12345 }).await;
    match recv(&mut ws).await {
        ServerMessage::HeartbeatAck { client_time, .. } => {
            assert_eq!(client_time, 12345);
        }
        other => panic!("expected HeartbeatAck, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_event_keeps_connection_open() {
    let server = start_server().await;
    let mut ws = connect_as(&server.ws_addr, 1).await;

    ws.send(Message::Text(r#"{"event":"testRoom","data":{}}"#.into()))
        .await
        .expect("send");
    match recv(&mut ws).await {
        ServerMessage::Error { code, event, .. } => {
            assert_eq!(code, 400);
            assert_eq!(event, None);
        }
        other => panic!("expected Error 400, got {other:?}"),
    }

    send(&mut ws, &ClientMessage::Heartbeat { client_time: 1 }).await;
    assert!(matches!(
        recv(&mut ws).await,
        ServerMessage::HeartbeatAck { client_time: 1, .. }
    ));
}

#[tokio::test]
async fn test_disconnect_closes_connection() {
    let server = start_server().await;
    let mut ws = connect_as(&server.ws_addr, 1).await;
    send(
        &mut ws,
        &ClientMessage::Disconnect {
            reason: "bye".into(),
        },
    )
    .await;

    let result = tokio::time::timeout(Duration::from_secs(2), ws.next()).await;
    match result {
        Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {}
        Ok(Some(Err(_))) => {}
        other => panic!("expected close, got {other:?}"),
    }
}

// =========================================================================
// Rooms
// =========================================================================

#[tokio::test]
async fn test_create_and_join_broadcast_room_updates() {
    let server = start_server().await;
    let mut leader = connect_as(&server.ws_addr, 1).await;
    send(
        &mut leader,
        &ClientMessage::CreateRoom {
            boss_id: MEWTWO,
            my_pokemon_id: PIKACHU,
        },
    )
    .await;
    let created = recv_room_update(&mut leader).await;
    assert_eq!(created.leader_id, UserId(1));
    assert_eq!(created.boss_pokemon_id, MEWTWO);
    assert_eq!(created.members.len(), 1);
    assert_eq!(created.members[0].order, 1);

    let mut guest = connect_as(&server.ws_addr, 2).await;
    send(
        &mut guest,
        &ClientMessage::JoinRoom {
            room_id: created.room_id.clone(),
            my_pokemon_id: PIKACHU,
        },
    )
    .await;
    let seen_by_leader = recv_room_update(&mut leader).await;
    let seen_by_guest = recv_room_update(&mut guest).await;
    assert_eq!(seen_by_leader, seen_by_guest);
    assert_eq!(seen_by_guest.event_type, EventType::JoinRoom);
    let orders: Vec<u64> = seen_by_guest.members.iter().map(|m| m.order).collect();
    assert_eq!(orders, vec![1, 2]);
}

#[tokio::test]
async fn test_join_unknown_room_is_404() {
    let server = start_server().await;
    let mut ws = connect_as(&server.ws_addr, 1).await;
    send(
        &mut ws,
        &ClientMessage::JoinRoom {
            room_id: RoomId::new("missing"),
            my_pokemon_id: PIKACHU,
        },
    )
    .await;
    expect_error(&mut ws, 404, "joinRoom").await;
}

#[tokio::test]
async fn test_create_with_unowned_pokemon_is_404() {
    let server = start_server().await;
    let mut ws = connect_as(&server.ws_addr, 1).await;
    send(
        &mut ws,
        &ClientMessage::CreateRoom {
            boss_id: MEWTWO,
            my_pokemon_id: PokemonId(999),
        },
    )
    .await;
    expect_error(&mut ws, 404, "createRoom").await;
}

#[tokio::test]
async fn test_fifth_member_is_rejected_with_409() {
    let server = start_server().await;
    let (mut leader, _guest, room_id) = room_of_two(&server.ws_addr).await;

    let mut others = Vec::new();
    for user in 3..=4 {
        let mut ws = connect_as(&server.ws_addr, user).await;
        send(
            &mut ws,
            &ClientMessage::JoinRoom {
                room_id: room_id.clone(),
                my_pokemon_id: PIKACHU,
            },
        )
        .await;
        recv_room_update(&mut ws).await;
        recv_room_update(&mut leader).await;
        others.push(ws);
    }

    let mut fifth = connect_as(&server.ws_addr, 5).await;
    send(
        &mut fifth,
        &ClientMessage::JoinRoom {
            room_id,
            my_pokemon_id: PIKACHU,
        },
    )
    .await;
    expect_error(&mut fifth, 409, "joinRoom").await;
}

#[tokio::test]
async fn test_joining_second_room_is_409() {
    let server = start_server().await;
    let (mut leader, _guest, _room) = room_of_two(&server.ws_addr).await;
    send(
        &mut leader,
        &ClientMessage::CreateRoom {
            boss_id: MEWTWO,
            my_pokemon_id: PIKACHU,
        },
    )
    .await;
    expect_error(&mut leader, 409, "createRoom").await;
}

#[tokio::test]
async fn test_leave_broadcasts_and_last_leave_destroys_room() {
    let server = start_server().await;
    let (mut leader, mut guest, room_id) = room_of_two(&server.ws_addr).await;

    send(
        &mut guest,
        &ClientMessage::LeaveRoom {
            room_id: room_id.clone(),
        },
    )
    .await;
    let update = recv_room_update(&mut leader).await;
    assert_eq!(update.event_type, EventType::LeaveRoom);
    assert_eq!(update.members.len(), 1);
    // The leaver sees the update too, then nothing more.
    let update = recv_room_update(&mut guest).await;
    assert_eq!(update.members.len(), 1);

    send(
        &mut leader,
        &ClientMessage::LeaveRoom {
            room_id: room_id.clone(),
        },
    )
    .await;
    let last = recv_room_update(&mut leader).await;
    assert!(last.members.is_empty());

    send(
        &mut leader,
        &ClientMessage::JoinRoom {
            room_id,
            my_pokemon_id: PIKACHU,
        },
    )
    .await;
    expect_error(&mut leader, 404, "joinRoom").await;
}

#[tokio::test]
async fn test_leave_when_not_member_is_403() {
    let server = start_server().await;
    let (_leader, _guest, room_id) = room_of_two(&server.ws_addr).await;
    let mut stranger = connect_as(&server.ws_addr, 3).await;
    send(&mut stranger, &ClientMessage::LeaveRoom { room_id }).await;
    expect_error(&mut stranger, 403, "leaveRoom").await;
}

#[tokio::test]
async fn test_dropped_connection_leaves_room() {
    let server = start_server().await;
    let (mut leader, guest, _room_id) = room_of_two(&server.ws_addr).await;

    drop(guest);
    let update = recv_room_update(&mut leader).await;
    assert_eq!(update.event_type, EventType::LeaveRoom);
    assert_eq!(update.members.len(), 1);
    assert_eq!(update.members[0].user_id, UserId(1));
}

#[tokio::test]
async fn test_room_traffic_keeps_a_listening_player_connected() {
    let server = start_server_with(Some(Duration::from_millis(400))).await;
    let (mut leader, mut guest, room_id) = room_of_two(&server.ws_addr).await;
    let mut visitor = connect_as(&server.ws_addr, 3).await;

    // The guest never writes again; only the visitor's comings and goings
    // reach it, each well inside the timeout.
    for _ in 0..4 {
        send(
            &mut visitor,
            &ClientMessage::JoinRoom {
                room_id: room_id.clone(),
                my_pokemon_id: PIKACHU,
            },
        )
        .await;
        assert_eq!(recv_room_update(&mut guest).await.members.len(), 3);
        recv_room_update(&mut leader).await;
        recv_room_update(&mut visitor).await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        send(
            &mut visitor,
            &ClientMessage::LeaveRoom {
                room_id: room_id.clone(),
            },
        )
        .await;
        let update = recv_room_update(&mut guest).await;
        assert_eq!(update.event_type, EventType::LeaveRoom);
        assert_eq!(update.members.len(), 2);
        recv_room_update(&mut leader).await;
        recv_room_update(&mut visitor).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
    }

    // Over a second since the guest last wrote: still seated.
    let (status, body) = http_get(&server.http_addr, "/rooms", Some("tok-2")).await;
    assert_eq!(status, 200);
    let rooms: Vec<RoomSnapshot> = serde_json::from_str(&body).expect("json body");
    assert_eq!(rooms[0].room_id, room_id);
    let seated: Vec<UserId> = rooms[0].members.iter().map(|m| m.user_id).collect();
    assert_eq!(seated, vec![UserId(1), UserId(2)]);
    send(&mut leader, &ClientMessage::Heartbeat { client_time: 1 }).await;
    assert!(matches!(recv(&mut leader).await, ServerMessage::HeartbeatAck { .. }));
    send(&mut guest, &ClientMessage::Heartbeat { client_time: 2 }).await;
    assert!(matches!(recv(&mut guest).await, ServerMessage::HeartbeatAck { .. }));
}

#[tokio::test]
async fn test_silent_player_keeps_seat_without_idle_timeout() {
    let server = start_server().await;
    let (mut leader, mut guest, room_id) = room_of_two(&server.ws_addr).await;
    send(
        &mut leader,
        &ClientMessage::StartRaid {
            room_id: room_id.clone(),
        },
    )
    .await;
    recv(&mut leader).await;
    recv(&mut guest).await;

    // The leader keeps talking; the guest only listens.
    for n in 0..5 {
        tokio::time::sleep(Duration::from_millis(150)).await;
        send(&mut leader, &ClientMessage::Heartbeat { client_time: n }).await;
        assert!(matches!(recv(&mut leader).await, ServerMessage::HeartbeatAck { .. }));
    }

    send(&mut leader, &ClientMessage::Action { room_id, skill_id: THUNDER }).await;
    // Turn passes to the guest, who is still alive and connected.
    match recv(&mut guest).await {
        ServerMessage::ChangeTurn(state) => {
            assert_eq!(state.turn.next, Actor::Player(UserId(2)));
            let guest_seat = state
                .participant(Actor::Player(UserId(2)))
                .expect("guest still in battle");
            assert_eq!(guest_seat.hp, 50);
            assert_eq!(state.status, BattleStatus::Fighting);
        }
        other => panic!("expected ChangeTurn, got {other:?}"),
    }
}

// =========================================================================
// Raids
// =========================================================================

#[tokio::test]
async fn test_start_raid_requires_leader() {
    let server = start_server().await;
    let (_leader, mut guest, room_id) = room_of_two(&server.ws_addr).await;
    send(&mut guest, &ClientMessage::StartRaid { room_id }).await;
    expect_error(&mut guest, 403, "startRaid").await;
}

#[tokio::test]
async fn test_start_raid_alone_is_412() {
    let server = start_server().await;
    let mut leader = connect_as(&server.ws_addr, 1).await;
    send(
        &mut leader,
        &ClientMessage::CreateRoom {
            boss_id: MEWTWO,
            my_pokemon_id: PIKACHU,
        },
    )
    .await;
    let room_id = recv_room_update(&mut leader).await.room_id;
    send(&mut leader, &ClientMessage::StartRaid { room_id }).await;
    expect_error(&mut leader, 412, "startRaid").await;
}

#[tokio::test]
async fn test_action_out_of_turn_is_403() {
    let server = start_server().await;
    let (mut leader, mut guest, room_id) = room_of_two(&server.ws_addr).await;
    send(
        &mut leader,
        &ClientMessage::StartRaid {
            room_id: room_id.clone(),
        },
    )
    .await;
    recv(&mut leader).await;
    recv(&mut guest).await;

    send(
        &mut guest,
        &ClientMessage::Action {
            room_id,
            skill_id: THUNDER,
        },
    )
    .await;
    expect_error(&mut guest, 403, "action").await;
}

/// Two players with 30-damage attacks against a 100 hp boss:
/// 100 → 70 → 40 → boss turn → 10 → 0.
#[tokio::test]
async fn test_full_raid_to_victory() {
    let server = start_server().await;
    let (mut leader, mut guest, room_id) = room_of_two(&server.ws_addr).await;

    send(
        &mut leader,
        &ClientMessage::StartRaid {
            room_id: room_id.clone(),
        },
    )
    .await;
    for ws in [&mut leader, &mut guest] {
        match recv(ws).await {
            ServerMessage::ChangeTurn(state) => {
                assert_eq!(state.event_type, EventType::StartRaid);
                assert_eq!(state.turn.count, 1);
                assert_eq!(state.turn.next, Actor::Player(UserId(1)));
                assert_eq!(state.boss().map(|b| b.hp), Some(100));
            }
            other => panic!("expected ChangeTurn, got {other:?}"),
        }
    }

    let mut boss_turns = 0;
    let mut last = None;
    let mut actor_is_leader = true;
    while last.is_none() {
        let ws = if actor_is_leader { &mut leader } else { &mut guest };
        send(
            ws,
            &ClientMessage::Action {
                room_id: room_id.clone(),
                skill_id: THUNDER,
            },
        )
        .await;

        // Drain the leader's view of every transition this action caused.
        loop {
            let state = match recv(&mut leader).await {
                ServerMessage::ChangeTurn(state) => state,
                other => panic!("expected ChangeTurn, got {other:?}"),
            };
            if state.event_type == EventType::BossAction {
                boss_turns += 1;
            }
            if state.status.is_terminal() {
                last = Some(state);
                break;
            }
            if state.turn.next != Actor::Boss {
                actor_is_leader = state.turn.next == Actor::Player(UserId(1));
                break;
            }
        }
    }

    let last = last.expect("raid finished");
    assert_eq!(last.status, BattleStatus::Win);
    assert_eq!(last.boss().map(|b| b.hp), Some(0));
    assert_eq!(boss_turns, 1);

    // Rewards are paid asynchronously.
    for _ in 0..50 {
        if server.ledger.balance(UserId(2)).await == 30 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(server.ledger.balance(UserId(1)).await, 30);
    assert_eq!(server.ledger.balance(UserId(2)).await, 30);

    // The room is gone; its members are free to create a new one.
    send(
        &mut leader,
        &ClientMessage::CreateRoom {
            boss_id: MEWTWO,
            my_pokemon_id: PIKACHU,
        },
    )
    .await;
    let fresh = recv_room_update(&mut leader).await;
    assert_ne!(fresh.room_id, room_id);
}

// =========================================================================
// HTTP
// =========================================================================

#[tokio::test]
async fn test_http_rooms_requires_session() {
    let server = start_server().await;
    let (status, body) = http_get(&server.http_addr, "/rooms", None).await;
    assert_eq!(status, 401);
    let body: serde_json::Value = serde_json::from_str(&body).expect("json body");
    assert_eq!(body["code"], 401);

    let (status, _) = http_get(&server.http_addr, "/rooms", Some("bogus")).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_http_rooms_lists_open_rooms() {
    let server = start_server().await;
    let (_leader, _guest, room_id) = room_of_two(&server.ws_addr).await;

    let (status, body) = http_get(&server.http_addr, "/rooms", Some("tok-3")).await;
    assert_eq!(status, 200);
    let rooms: Vec<RoomSnapshot> = serde_json::from_str(&body).expect("json body");
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].room_id, room_id);
    assert_eq!(rooms[0].event_type, EventType::Http);
    assert_eq!(rooms[0].members.len(), 2);

    let (status, _) =
        http_get(&server.http_addr, "/rooms?sessionId=tok-4", None).await;
    assert_eq!(status, 200);
}
