//! End-to-end pipeline tests.
//!
//! These run the real supervisor with a synthetic frame source and `cat`
//! standing in for ffmpeg, so the full capture → transcode → fan-out path
//! and the ordered shutdown sequence are exercised against a live child
//! process and live listeners (bound on ephemeral ports).

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use rigcast::hardware::{DriverCall, RecordingDriver};
use rigcast::{Config, PatternSource, PipelineState, Supervisor};

fn test_config() -> Config {
    Config {
        width: 32,
        height: 16,
        framerate: 50,
        http_port: 0,
        ws_port: 0,
        transcoder_command: Some(vec!["cat".to_string()]),
        source: rigcast::SourceKind::Pattern,
        ..Config::default()
    }
}

fn assert_safe_tail(calls: &[DriverCall]) {
    let tail = &calls[calls.len() - 4..];
    assert_eq!(
        tail,
        &[
            DriverCall::ServoEnable { channel: 1, enabled: false },
            DriverCall::ServoEnable { channel: 2, enabled: false },
            DriverCall::Clear,
            DriverCall::Show,
        ],
        "hardware must end disabled and blank"
    );
}

async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("connect to control listener");
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

/// Minimal WebSocket client handshake; returns the socket positioned at the
/// first frame byte.
async fn ws_handshake(addr: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.expect("connect to stream listener");
    let request = "GET / HTTP/1.1\r\n\
                   Host: localhost\r\n\
                   Upgrade: websocket\r\n\
                   Connection: Upgrade\r\n\
                   Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
                   Sec-WebSocket-Version: 13\r\n\r\n";
    stream.write_all(request.as_bytes()).await.unwrap();

    // Byte-at-a-time so no frame data is consumed with the headers.
    let mut response = Vec::new();
    while !response.ends_with(b"\r\n\r\n") {
        let mut byte = [0u8; 1];
        stream.read_exact(&mut byte).await.unwrap();
        response.push(byte[0]);
    }
    let response = String::from_utf8_lossy(&response);
    assert!(response.starts_with("HTTP/1.1 101"), "got: {response}");
    stream
}

/// Read one server frame: `(opcode, payload)`. Server frames are unmasked.
async fn read_ws_frame(stream: &mut TcpStream) -> (u8, Vec<u8>) {
    let mut head = [0u8; 2];
    stream.read_exact(&mut head).await.unwrap();
    let opcode = head[0] & 0x0F;
    let len = match head[1] & 0x7F {
        126 => {
            let mut ext = [0u8; 2];
            stream.read_exact(&mut ext).await.unwrap();
            u16::from_be_bytes(ext) as usize
        }
        127 => {
            let mut ext = [0u8; 8];
            stream.read_exact(&mut ext).await.unwrap();
            u64::from_be_bytes(ext) as usize
        }
        n => n as usize,
    };
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.unwrap();
    (opcode, payload)
}

#[tokio::test]
async fn stream_carries_header_then_encoded_chunks() {
    let config = test_config();
    let driver = RecordingDriver::new();
    let probe = driver.clone();
    let source = PatternSource::new(&config);

    let handle = Supervisor::start(config, Box::new(driver), source).await.unwrap();
    let state = handle.state_receiver();

    let mut subscription = handle.subscribe();
    let header = subscription.header.encode();
    assert_eq!(&header[..4], b"jsmp");
    assert_eq!(header[4..6], 32u16.to_be_bytes());
    assert_eq!(header[6..8], 16u16.to_be_bytes());

    // With `cat` as the transcoder, broadcast chunks are raw pattern bytes.
    let chunk = timeout(Duration::from_secs(5), subscription.chunks.recv())
        .await
        .expect("a chunk should arrive while the pipeline runs")
        .unwrap();
    assert!(!chunk.is_empty());

    handle.shutdown();
    handle.wait().await;
    assert_eq!(*state.borrow(), PipelineState::Stopped);

    let calls = probe.calls();
    // Startup left the servos disabled...
    assert_eq!(calls[0], DriverCall::Configure);
    // ...and teardown forced the safe state.
    assert_safe_tail(&calls);
}

#[tokio::test]
async fn pipeline_stops_on_its_own_when_the_source_ends() {
    let config = test_config();
    let driver = RecordingDriver::new();
    let probe = driver.clone();
    let source = PatternSource::new(&config).with_limit(5);

    let handle = Supervisor::start(config, Box::new(driver), source).await.unwrap();
    let mut state = handle.state_receiver();

    // No shutdown call: the limited source ends, the transcoder drains and
    // exits, the broadcast loop observes end-of-stream, and the supervisor
    // walks the teardown sequence by itself.
    timeout(Duration::from_secs(10), async {
        while *state.borrow_and_update() != PipelineState::Stopped {
            state.changed().await.unwrap();
        }
    })
    .await
    .expect("pipeline should reach Stopped without an external signal");

    handle.wait().await;
    assert_safe_tail(&probe.calls());
}

#[tokio::test]
async fn control_plane_drives_the_hardware_over_http() {
    let config = test_config();
    let driver = RecordingDriver::new();
    let probe = driver.clone();
    let source = PatternSource::new(&config);

    let handle = Supervisor::start(config, Box::new(driver), source).await.unwrap();

    let ok = http_get(handle.http_addr(), "/do_orient?pan=10&tilt=-20").await;
    assert!(ok.starts_with("HTTP/1.1 200"), "got: {ok}");

    let calls = probe.calls();
    assert!(calls.contains(&DriverCall::SetAngle { channel: 1, degrees: -10 }));
    assert!(calls.contains(&DriverCall::SetAngle { channel: 2, degrees: 20 }));

    let lit = http_get(handle.http_addr(), "/do_light?-1=1,2,3,4").await;
    assert!(lit.starts_with("HTTP/1.1 200"), "got: {lit}");
    let shows = probe.calls().iter().filter(|c| matches!(c, DriverCall::Show)).count();
    assert_eq!(shows, 1);

    handle.shutdown();
    handle.wait().await;
}

#[tokio::test]
async fn malformed_control_requests_are_rejected_without_side_effects() {
    let config = test_config();
    let driver = RecordingDriver::new();
    let probe = driver.clone();
    let source = PatternSource::new(&config);

    let handle = Supervisor::start(config, Box::new(driver), source).await.unwrap();
    let calls_after_startup = probe.calls().len();

    let bad_orient = http_get(handle.http_addr(), "/do_orient?pan=fast").await;
    assert!(bad_orient.starts_with("HTTP/1.1 400"), "got: {bad_orient}");

    // Parseable but unnegatable; must be rejected before any servo enable.
    let overflow = http_get(handle.http_addr(), "/do_orient?pan=-2147483648").await;
    assert!(overflow.starts_with("HTTP/1.1 400"), "got: {overflow}");

    let bad_light = http_get(handle.http_addr(), "/do_light?0=1,2,3").await;
    assert!(bad_light.starts_with("HTTP/1.1 400"), "got: {bad_light}");

    // Neither rejected request may have touched the driver.
    assert_eq!(probe.calls().len(), calls_after_startup);

    handle.shutdown();
    handle.wait().await;
}

#[tokio::test]
async fn websocket_clients_get_the_header_before_any_chunk() {
    let config = test_config();
    let source = PatternSource::new(&config);
    let handle =
        Supervisor::start(config, Box::new(RecordingDriver::new()), source).await.unwrap();

    // Connect over the wire, not through the local subscribe bypass: the
    // handler itself owns the header-before-chunks ordering.
    let mut socket = timeout(Duration::from_secs(5), ws_handshake(handle.ws_addr()))
        .await
        .expect("handshake should complete");

    let (opcode, header) = timeout(Duration::from_secs(5), read_ws_frame(&mut socket))
        .await
        .expect("header frame should arrive");
    assert_eq!(opcode, 0x2, "first frame must be binary");
    assert_eq!(header.len(), 8);
    assert_eq!(&header[..4], b"jsmp");
    assert_eq!(header[4..6], 32u16.to_be_bytes());
    assert_eq!(header[6..8], 16u16.to_be_bytes());

    // Everything after the header is live chunk data, forwarded verbatim.
    let (opcode, chunk) = timeout(Duration::from_secs(5), read_ws_frame(&mut socket))
        .await
        .expect("a chunk frame should follow");
    assert_eq!(opcode, 0x2);
    assert!(!chunk.is_empty());

    handle.shutdown();
    handle.wait().await;
}

#[tokio::test]
async fn every_subscriber_sees_the_same_chunks() {
    let config = test_config();
    let source = PatternSource::new(&config);
    let handle =
        Supervisor::start(config, Box::new(RecordingDriver::new()), source).await.unwrap();

    let mut first = handle.subscribe();
    let mut second = handle.subscribe();

    // Every chunk the later subscriber sees must also reach the earlier one.
    let b = timeout(Duration::from_secs(5), second.chunks.recv()).await.unwrap().unwrap();
    let mut found = false;
    for _ in 0..100 {
        let a = timeout(Duration::from_secs(5), first.chunks.recv()).await.unwrap().unwrap();
        if a == b {
            found = true;
            break;
        }
    }
    assert!(found, "later subscriber's chunk never reached the earlier subscriber");

    handle.shutdown();
    handle.wait().await;
}
