//! Framed connection over real sockets on 127.0.0.1

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use lan_tetris::net::protocol::{create_attack, create_board, create_dead, Message};
use lan_tetris::net::{Connection, NetError};

const WAIT: Duration = Duration::from_secs(2);

/// Longer than the per-write timeout of the transport
const STALL_WAIT: Duration = Duration::from_secs(5);

async fn raw_pair() -> (TcpStream, Connection) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (accepted, conn) = tokio::join!(listener.accept(), Connection::connect(addr, WAIT));
    (accepted.unwrap().0, conn.unwrap())
}

async fn next(conn: &mut Connection) -> Option<Message> {
    tokio::time::timeout(WAIT, conn.recv())
        .await
        .expect("timed out waiting for a frame")
}

#[tokio::test]
async fn test_frames_split_across_writes_are_reassembled() {
    let (mut raw, mut conn) = raw_pair().await;

    raw.write_all(br#"{"t":"atk","#).await.unwrap();
    raw.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    raw.write_all(b"\"n\":3}\n{\"t\":\"dead\"}\n").await.unwrap();

    assert_eq!(next(&mut conn).await, Some(create_attack(3)));
    assert_eq!(next(&mut conn).await, Some(create_dead(None)));
}

#[tokio::test]
async fn test_malformed_lines_are_skipped() {
    let (mut raw, mut conn) = raw_pair().await;

    raw.write_all(b"hello there\n").await.unwrap();
    raw.write_all(&[0xff, 0xfe, b'\n']).await.unwrap();
    raw.write_all(b"{\"t\":\"warp\"}\n\n").await.unwrap();
    raw.write_all(b"{\"t\":\"atk\",\"n\":1}\n").await.unwrap();

    assert_eq!(next(&mut conn).await, Some(create_attack(1)));
    assert!(conn.is_alive());
}

#[tokio::test]
async fn test_sent_frames_are_newline_terminated_json() {
    let (raw, conn) = raw_pair().await;
    conn.send(create_attack(4));
    conn.send(create_dead(Some(2)));

    let mut lines = BufReader::new(raw).lines();
    let first = tokio::time::timeout(WAIT, lines.next_line())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let second = tokio::time::timeout(WAIT, lines.next_line())
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let first: serde_json::Value = serde_json::from_str(&first).unwrap();
    let second: serde_json::Value = serde_json::from_str(&second).unwrap();
    assert_eq!(first["t"], "atk");
    assert_eq!(first["n"], 4);
    assert_eq!(second["t"], "dead");
    assert_eq!(second["id"], 2);
}

#[tokio::test]
async fn test_close_flushes_then_shuts_down() {
    let (mut raw, mut conn) = raw_pair().await;
    conn.send(create_attack(2));
    conn.close();
    conn.close();
    assert!(!conn.is_alive());

    let mut received = String::new();
    tokio::time::timeout(WAIT, raw.read_to_string(&mut received))
        .await
        .expect("socket was not shut down")
        .unwrap();
    assert_eq!(received, "{\"t\":\"atk\",\"n\":2}\n");

    // Sending after close is a silent no-op.
    conn.send(create_attack(9));
}

#[tokio::test]
async fn test_peer_hangup_marks_connection_dead() {
    let (raw, mut conn) = raw_pair().await;
    drop(raw);

    assert_eq!(next(&mut conn).await, None);
    assert!(!conn.is_alive());
}

#[tokio::test]
async fn test_connect_to_closed_port_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = Connection::connect(addr, WAIT).await.unwrap_err();
    assert!(
        matches!(err, NetError::Io(_) | NetError::ConnectTimeout { .. }),
        "unexpected error {:?}",
        err
    );
}

/// Queue far more than the loopback socket buffers can hold
fn flood(conn: &Connection) -> usize {
    let frame = create_board(None, "x".repeat(64 * 1024), true);
    let frame_len = lan_tetris::net::protocol::encode_line(&frame).unwrap().len();
    let frames = 400;
    for _ in 0..frames {
        conn.send(frame.clone());
    }
    frames * frame_len
}

async fn read_until_closed(raw: &mut TcpStream) -> usize {
    let mut total = 0;
    let mut buf = vec![0u8; 64 * 1024];
    tokio::time::timeout(STALL_WAIT, async {
        loop {
            match raw.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => total += n,
            }
        }
    })
    .await
    .expect("socket was never released");
    total
}

#[tokio::test]
async fn test_close_gives_up_on_a_peer_that_stopped_reading() {
    let (mut raw, mut conn) = raw_pair().await;
    let queued = flood(&conn);

    // Let the writer fill the socket buffers and stall.
    tokio::time::sleep(Duration::from_millis(300)).await;
    conn.close();
    tokio::time::sleep(Duration::from_millis(800)).await;

    let received = read_until_closed(&mut raw).await;
    assert!(
        received < queued,
        "expected the stalled backlog to be dropped, got {} of {} bytes",
        received,
        queued
    );
}

#[tokio::test]
async fn test_stalled_write_marks_connection_dead() {
    let (_raw, conn) = raw_pair().await;
    flood(&conn);

    tokio::time::timeout(STALL_WAIT, async {
        while conn.is_alive() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("a peer that never reads kept the connection alive");
}
