//! End-to-end websocket tests against the real router and the in-memory
//! room directory.

use std::sync::Arc;
use std::time::Duration;

use frames::event::RoomSnapshot;
use frames::{Event, FRAME_CODE, Frame, Status};
use futures::{SinkExt, StreamExt};
use server::config::Config;
use server::services::directory::{MemoryDirectory, RoomDirectory, RoomRecord};
use server::services::identity::DevIdentity;
use server::state::AppState;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const ROOM: &str = "room-e2e";

async fn spawn_server() -> (String, Arc<MemoryDirectory>) {
    let directory = Arc::new(MemoryDirectory::new());
    directory
        .insert(RoomRecord::empty(ROOM, "Chemistry", Some("u-owner".into())))
        .await;
    let state = AppState::new(Config::default(), directory.clone(), Arc::new(DevIdentity));
    let app = server::routes::app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (format!("127.0.0.1:{}", addr.port()), directory)
}

async fn connect(addr: &str, token: &str) -> Socket {
    let (mut socket, _) = connect_async(format!("ws://{addr}/api/ws?token={token}")).await.expect("connect");
    let hello = recv(&mut socket).await;
    assert_eq!(hello.syscall, "session:connected");
    socket
}

async fn send(socket: &mut Socket, frame: &Frame) {
    socket.send(Message::Binary(frames::encode_frame(frame).into())).await.expect("send");
}

async fn recv(socket: &mut Socket) -> Frame {
    loop {
        let msg = timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("receive timed out")
            .expect("socket closed")
            .expect("socket error");
        match msg {
            Message::Binary(bytes) => return frames::decode_frame(&bytes).expect("decode"),
            Message::Text(text) => return frames::decode_json_frame(text.as_str()).expect("decode json"),
            _ => {}
        }
    }
}

/// Receive until a frame with `syscall` arrives, skipping roster updates.
async fn recv_syscall(socket: &mut Socket, syscall: &str) -> Frame {
    loop {
        let frame = recv(socket).await;
        if frame.syscall == syscall {
            return frame;
        }
        assert_eq!(frame.syscall, "room:users", "unexpected frame {frame:?}");
    }
}

async fn join(socket: &mut Socket) -> RoomSnapshot {
    send(socket, &Event::Join { username: String::new() }.to_frame().with_room_id(ROOM)).await;
    let reply = recv_syscall(socket, "room:join").await;
    assert_eq!(reply.status, Status::Done);
    match Event::from_frame(&reply) {
        Ok(Event::Snapshot(snapshot)) => snapshot,
        other => panic!("expected snapshot, got {other:?}"),
    }
}

fn rect() -> frames::Element {
    serde_json::from_value(serde_json::json!({
        "id": uuid::Uuid::new_v4(),
        "timestamp": 1,
        "type": "rect",
        "x": 0.0, "y": 0.0, "width": 20.0, "height": 20.0
    }))
    .expect("rect")
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let (addr, _directory) = spawn_server().await;
    let err = connect_async(format!("ws://{addr}/api/ws")).await.expect_err("upgrade should fail");
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => assert_eq!(response.status(), 401),
        other => panic!("expected http 401, got {other:?}"),
    }
}

#[tokio::test]
async fn healthz_and_room_probe() {
    let (addr, _directory) = spawn_server().await;
    let mut stream = TcpStream::connect(&addr).await.expect("tcp");
    let req = format!("GET /api/rooms/nope HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    tokio::io::AsyncWriteExt::write_all(&mut stream, req.as_bytes()).await.expect("write");
    let mut body = String::new();
    tokio::io::AsyncReadExt::read_to_string(&mut stream, &mut body).await.expect("read");
    assert!(body.starts_with("HTTP/1.1 404"), "got {body}");
}

#[tokio::test]
async fn owner_draws_participant_sees_and_directory_persists_on_leave() {
    let (addr, directory) = spawn_server().await;
    let mut owner = connect(&addr, "u-owner:owner:Ms%20Frizzle").await;
    let mut student = connect(&addr, "u-student:participant:Arnold").await;

    assert!(join(&mut owner).await.elements.is_empty());
    let snapshot = join(&mut student).await;
    assert_eq!(snapshot.name, "Chemistry");
    assert!(snapshot.allow_list.is_empty());

    let element = rect();
    send(&mut owner, &Event::DrawElement { element: element.clone() }.to_frame()).await;
    let relayed = recv_syscall(&mut student, "element:draw").await;
    assert_eq!(relayed.from.as_deref(), Some("u-owner"));
    assert_eq!(Event::from_frame(&relayed).expect("event"), Event::DrawElement { element: element.clone() });

    owner.close(None).await.expect("close owner");
    student.close(None).await.expect("close student");

    let mut persisted = Vec::new();
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        persisted = directory.get(ROOM).await.expect("record").elements;
        if !persisted.is_empty() {
            break;
        }
    }
    assert_eq!(persisted, vec![element]);
}

#[tokio::test]
async fn participant_edits_are_gated_by_the_allow_list() {
    let (addr, directory) = spawn_server().await;
    let mut owner = connect(&addr, "u-owner:owner:Ms%20Frizzle").await;
    let mut student = connect(&addr, "u-student:participant:Arnold").await;
    join(&mut owner).await;
    join(&mut student).await;

    send(&mut student, &Event::DrawElement { element: rect() }.to_frame()).await;
    let rejected = recv_syscall(&mut student, "element:draw").await;
    assert_eq!(rejected.status, Status::Error);
    assert_eq!(rejected.data_str(FRAME_CODE), Some("E_FORBIDDEN"));

    send(&mut owner, &Event::GrantPermission { user_id: "u-student".into() }.to_frame()).await;
    let changed = recv_syscall(&mut student, "permission:changed").await;
    assert_eq!(Event::from_frame(&changed).expect("event"), Event::PermissionChanged { allowed: true });
    assert_eq!(directory.get(ROOM).await.expect("record").allow_list, vec!["u-student".to_owned()]);

    let element = rect();
    send(&mut student, &Event::DrawElement { element: element.clone() }.to_frame()).await;
    let relayed = recv_syscall(&mut owner, "element:draw").await;
    assert_eq!(relayed.from.as_deref(), Some("u-student"));
}

#[tokio::test]
async fn json_text_frames_get_json_replies() {
    let (addr, _directory) = spawn_server().await;
    let mut owner = connect(&addr, "u-owner:owner").await;

    let join = Event::Join { username: String::new() }.to_frame().with_room_id(ROOM);
    owner.send(Message::Text(frames::encode_json_frame(&join).into())).await.expect("send");

    loop {
        let msg = timeout(Duration::from_secs(2), owner.next())
            .await
            .expect("receive timed out")
            .expect("socket closed")
            .expect("socket error");
        if let Message::Text(text) = msg {
            let frame = frames::decode_json_frame(text.as_str()).expect("json frame");
            if frame.syscall == "room:join" {
                assert_eq!(frame.status, Status::Done);
                break;
            }
        } else {
            assert!(!matches!(msg, Message::Binary(_)), "reply should use the json encoding");
        }
    }
}

#[tokio::test]
async fn deletion_notice_reaches_connected_clients() {
    let (addr, directory) = spawn_server().await;
    let mut owner = connect(&addr, "u-owner:owner").await;
    join(&mut owner).await;
    directory.remove(ROOM).await;

    let mut stream = TcpStream::connect(&addr).await.expect("tcp");
    let req = format!(
        "POST /internal/rooms/{ROOM}/deleted HTTP/1.1\r\nHost: {addr}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    );
    tokio::io::AsyncWriteExt::write_all(&mut stream, req.as_bytes()).await.expect("write");

    let deleted = recv_syscall(&mut owner, "room:deleted").await;
    assert_eq!(deleted.room_id.as_deref(), Some(ROOM));
}
