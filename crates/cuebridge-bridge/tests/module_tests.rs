//! Built-in module tests
//!
//! Each module is driven on its own through a recording dispatch and real
//! sockets on localhost.

use bytes::Bytes;
use cuebridge_bridge::{
    IntervalModule, TcpClientModule, TcpServerModule, UdpClientModule, UdpServerModule,
};
use cuebridge_core::{CancellationToken, Module, ModuleConfig, ModuleError, Params, Payload};
use cuebridge_transport::DEFAULT_MAX_MESSAGE_SIZE;
use cuebridge_test_utils::{
    find_available_port, find_available_udp_port, wait_for, RecordingDispatch,
    DEFAULT_CHECK_INTERVAL, DEFAULT_TIMEOUT,
};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::task::JoinHandle;

fn spawn_module<M: Module + 'static>(
    module: Arc<M>,
    dispatch: &RecordingDispatch,
) -> (CancellationToken, JoinHandle<Result<(), ModuleError>>) {
    let cancel = CancellationToken::new();
    let ctx = dispatch.context(cancel.clone());
    let handle = tokio::spawn(async move { module.start(ctx).await });
    (cancel, handle)
}

async fn join(handle: JoinHandle<Result<(), ModuleError>>) {
    tokio::time::timeout(DEFAULT_TIMEOUT, handle)
        .await
        .expect("module did not stop")
        .expect("module task panicked")
        .expect("module returned an error");
}

fn bytes(s: &'static str) -> Payload {
    Payload::Bytes(Bytes::from_static(s.as_bytes()))
}

// ============================================================================
// TCP
// ============================================================================

#[tokio::test]
async fn test_tcp_server_dispatches_and_broadcasts() {
    let port = find_available_port().await;
    let config = ModuleConfig::new("tcp-in", TcpServerModule::TYPE)
        .with_params(Params::new().with("ip", "127.0.0.1").with("port", port));
    let module = Arc::new(TcpServerModule::from_config(&config).unwrap());
    let dispatch = RecordingDispatch::new();
    let (cancel, handle) = spawn_module(module.clone(), &dispatch);

    assert!(
        wait_for(
            || async { module.local_addr().is_some() },
            DEFAULT_CHECK_INTERVAL,
            DEFAULT_TIMEOUT
        )
        .await
    );

    let mut client = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    client.write_all(b"hello\nwor").await.unwrap();
    client.write_all(b"ld\n").await.unwrap();

    assert!(dispatch.wait_for_count(2, DEFAULT_TIMEOUT).await);
    assert_eq!(
        dispatch.events(),
        vec![
            ("tcp-in".to_string(), bytes("hello")),
            ("tcp-in".to_string(), bytes("world")),
        ]
    );

    assert!(
        wait_for(
            || async { module.client_count() == 1 },
            DEFAULT_CHECK_INTERVAL,
            DEFAULT_TIMEOUT
        )
        .await
    );
    module.output(Payload::from("pong")).await.unwrap();

    let mut reply = [0u8; 5];
    client.read_exact(&mut reply).await.unwrap();
    assert_eq!(&reply, b"pong\n");

    cancel.cancel();
    join(handle).await;
    assert!(module.local_addr().is_none());
}

#[tokio::test]
async fn test_tcp_server_output_without_clients_fails() {
    let port = find_available_port().await;
    let config = ModuleConfig::new("tcp-in", TcpServerModule::TYPE)
        .with_params(Params::new().with("ip", "127.0.0.1").with("port", port));
    let module = Arc::new(TcpServerModule::from_config(&config).unwrap());
    let dispatch = RecordingDispatch::new();
    let (_cancel, handle) = spawn_module(module.clone(), &dispatch);

    assert!(
        wait_for(
            || async { module.local_addr().is_some() },
            DEFAULT_CHECK_INTERVAL,
            DEFAULT_TIMEOUT
        )
        .await
    );
    assert!(module.output(Payload::from("x")).await.is_err());

    module.stop();
    join(handle).await;
}

#[tokio::test]
async fn test_tcp_server_drops_client_sending_oversized_message() {
    let port = find_available_port().await;
    let config = ModuleConfig::new("tcp-in", TcpServerModule::TYPE)
        .with_params(Params::new().with("ip", "127.0.0.1").with("port", port));
    let module = Arc::new(TcpServerModule::from_config(&config).unwrap());
    let dispatch = RecordingDispatch::new();
    let (cancel, handle) = spawn_module(module.clone(), &dispatch);

    assert!(
        wait_for(
            || async { module.local_addr().is_some() },
            DEFAULT_CHECK_INTERVAL,
            DEFAULT_TIMEOUT
        )
        .await
    );

    let mut flood = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    // The write may be cut short by the reset
    let _ = flood
        .write_all(&vec![b'x'; DEFAULT_MAX_MESSAGE_SIZE + 1024])
        .await;

    // The server hangs up once the unterminated message passes the limit
    let mut rest = Vec::new();
    let read = tokio::time::timeout(DEFAULT_TIMEOUT, flood.read_to_end(&mut rest)).await;
    assert!(read.is_ok(), "server kept the connection open");
    assert!(
        wait_for(
            || async { module.client_count() == 0 },
            DEFAULT_CHECK_INTERVAL,
            DEFAULT_TIMEOUT
        )
        .await
    );
    assert_eq!(dispatch.count(), 0);

    // Other clients are unaffected
    let mut client = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    client.write_all(b"hi\n").await.unwrap();
    assert!(dispatch.wait_for_count(1, DEFAULT_TIMEOUT).await);
    assert_eq!(dispatch.payloads(), vec![bytes("hi")]);

    cancel.cancel();
    join(handle).await;
}

#[tokio::test]
async fn test_tcp_client_clears_framer_on_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let config = ModuleConfig::new("tcp-out", TcpClientModule::TYPE).with_params(
        Params::new()
            .with("host", "127.0.0.1")
            .with("port", port)
            .with("framing", "CRLF")
            .with("reconnect_ms", 50),
    );
    let module = Arc::new(TcpClientModule::from_config(&config).unwrap());
    let dispatch = RecordingDispatch::new();
    let (cancel, handle) = spawn_module(module.clone(), &dispatch);

    let (mut first, _) = tokio::time::timeout(DEFAULT_TIMEOUT, listener.accept())
        .await
        .unwrap()
        .unwrap();
    first.write_all(b"one\r\npar").await.unwrap();
    assert!(dispatch.wait_for_count(1, DEFAULT_TIMEOUT).await);

    assert!(
        wait_for(
            || async { module.is_connected() },
            DEFAULT_CHECK_INTERVAL,
            DEFAULT_TIMEOUT
        )
        .await
    );
    module.output(Payload::from("reply")).await.unwrap();
    let mut reply = [0u8; 7];
    first.read_exact(&mut reply).await.unwrap();
    assert_eq!(&reply, b"reply\r\n");

    // The partial "par" must not leak into the next connection
    drop(first);

    let (mut second, _) = tokio::time::timeout(DEFAULT_TIMEOUT, listener.accept())
        .await
        .unwrap()
        .unwrap();
    second.write_all(b"two\r\n").await.unwrap();

    assert!(dispatch.wait_for_count(2, DEFAULT_TIMEOUT).await);
    assert_eq!(dispatch.payloads(), vec![bytes("one"), bytes("two")]);

    cancel.cancel();
    join(handle).await;
    assert!(!module.is_connected());
}

// ============================================================================
// UDP
// ============================================================================

#[tokio::test]
async fn test_udp_server_dispatches_datagrams() {
    let port = find_available_udp_port();
    let config = ModuleConfig::new("udp-in", UdpServerModule::TYPE)
        .with_params(Params::new().with("ip", "127.0.0.1").with("port", port));
    let module = Arc::new(UdpServerModule::from_config(&config).unwrap());
    let dispatch = RecordingDispatch::new();
    let (cancel, handle) = spawn_module(module.clone(), &dispatch);

    assert!(
        wait_for(
            || async { module.local_addr().is_some() },
            DEFAULT_CHECK_INTERVAL,
            DEFAULT_TIMEOUT
        )
        .await
    );

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender.send_to(b"/cue/1", ("127.0.0.1", port)).await.unwrap();
    sender.send_to(b"/cue/2", ("127.0.0.1", port)).await.unwrap();

    assert!(dispatch.wait_for_count(2, DEFAULT_TIMEOUT).await);
    assert_eq!(dispatch.payloads(), vec![bytes("/cue/1"), bytes("/cue/2")]);

    cancel.cancel();
    join(handle).await;
}

#[tokio::test]
async fn test_udp_client_sends_datagrams() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = receiver.local_addr().unwrap().port();

    let config = ModuleConfig::new("udp-out", UdpClientModule::TYPE)
        .with_params(Params::new().with("host", "127.0.0.1").with("port", port));
    let module = Arc::new(UdpClientModule::from_config(&config).unwrap());
    let dispatch = RecordingDispatch::new();
    let (cancel, handle) = spawn_module(module.clone(), &dispatch);

    let sent = wait_for(
        || {
            let module = module.clone();
            async move { module.output(Payload::from("ping")).await.is_ok() }
        },
        DEFAULT_CHECK_INTERVAL,
        DEFAULT_TIMEOUT,
    )
    .await;
    assert!(sent);

    let mut buf = [0u8; 64];
    let (len, _) = tokio::time::timeout(DEFAULT_TIMEOUT, receiver.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..len], b"ping");

    assert!(module.output(Payload::Int(1)).await.is_err());
    assert_eq!(dispatch.count(), 0);

    cancel.cancel();
    join(handle).await;
}

// ============================================================================
// Interval
// ============================================================================

#[tokio::test]
async fn test_interval_counts_ticks_until_stopped() {
    let config = ModuleConfig::new("clock", IntervalModule::TYPE)
        .with_params(Params::new().with("interval_ms", 10));
    let module = Arc::new(IntervalModule::from_config(&config).unwrap());
    let dispatch = RecordingDispatch::new();
    let (_cancel, handle) = spawn_module(module.clone(), &dispatch);

    assert!(dispatch.wait_for_count(3, DEFAULT_TIMEOUT).await);

    module.stop();
    join(handle).await;

    let payloads = dispatch.payloads();
    assert_eq!(
        &payloads[..3],
        &[Payload::Int(1), Payload::Int(2), Payload::Int(3)]
    );
    assert!(dispatch.events().iter().all(|(id, _)| id == "clock"));
}
