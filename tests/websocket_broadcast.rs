//! Live websocket delivery against real clients

use std::net::SocketAddr;
use std::time::Duration;

use futures::StreamExt;
use groundlink::{DecoderRegistry, Fanout, Pipeline, Transmission, TransmissionType, WebSocketServer};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Wire encoding of `"<tag> <data>"` split into packets of `max_payload` bytes
fn encode_transmission(number: u8, tag: &str, data: &str, max_payload: usize) -> Vec<u8> {
    let text = format!("{} {}", tag, data);
    let chunks: Vec<&[u8]> = text.as_bytes().chunks(max_payload).collect();
    let mut bytes = Vec::new();
    for (packet, chunk) in chunks.iter().enumerate() {
        bytes.extend([number, packet as u8, chunks.len() as u8]);
        bytes.extend_from_slice(chunk);
        bytes.push(b'@');
    }
    bytes
}

async fn start_server(fanout: &Fanout, cancel: &CancellationToken) -> SocketAddr {
    let server = WebSocketServer::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = server.local_addr();
    tokio::spawn(server.run(fanout.clone(), DecoderRegistry::new(), cancel.clone()));
    addr
}

async fn connect(addr: SocketAddr, path: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{}{}", addr, path)).await.unwrap();
    ws
}

/// Subscriptions happen after the handshake, inside the server task
async fn wait_for_consumers(fanout: &Fanout, count: usize) {
    tokio::time::timeout(TIMEOUT, async {
        while fanout.consumer_count() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("clients never subscribed");
}

async fn next_text(client: &mut Client) -> String {
    let message = tokio::time::timeout(TIMEOUT, client.next())
        .await
        .expect("no message in time")
        .expect("stream ended")
        .expect("websocket error");
    match message {
        Message::Text(text) => text.as_str().to_owned(),
        other => panic!("expected text message, got {:?}", other),
    }
}

#[tokio::test]
async fn every_client_receives_identical_json() {
    let _ = tracing_subscriber::fmt::try_init();
    let fanout = Fanout::new();
    let cancel = CancellationToken::new();
    let addr = start_server(&fanout, &cancel).await;

    let mut clients = Vec::new();
    for path in ["/", "/telemetry", "/any/path"] {
        clients.push(connect(addr, path).await);
    }
    wait_for_consumers(&fanout, 3).await;

    fanout.publish(Transmission::new(7, TransmissionType::Alt, "pressure=861.61\ttemperature=0".into(), 12.5));

    let mut received = Vec::new();
    for client in &mut clients {
        received.push(next_text(client).await);
    }

    assert!(received.iter().all(|json| json == &received[0]));
    let samples: serde_json::Value = serde_json::from_str(&received[0]).unwrap();
    assert_eq!(samples[0]["source"], "TEMP");
    assert_eq!(samples[0]["value"], 32.0);
    assert_eq!(samples[1]["source"], "PRESSURE");
    assert_eq!(samples[2]["source"], "ALTITUDE");
    assert!(samples[2]["value"].as_f64().unwrap().abs() < 1e-6);
    assert_eq!(samples[2]["time"], 12.5);

    cancel.cancel();
}

#[tokio::test]
async fn unknown_type_sends_nothing() {
    let fanout = Fanout::new();
    let log_stream = fanout.stream();
    let cancel = CancellationToken::new();
    let addr = start_server(&fanout, &cancel).await;

    let mut client = connect(addr, "/").await;
    wait_for_consumers(&fanout, 2).await;

    fanout.publish(Transmission::new(1, TransmissionType::Unknown("PING".into()), "hello".into(), 0.0));
    fanout.publish(Transmission::new(2, TransmissionType::Loop, "lastLoopStart=1".into(), 0.0));
    fanout.publish(Transmission::new(3, TransmissionType::Log, "after".into(), 0.0));

    // The first message a client sees is the LOG line
    assert_eq!(next_text(&mut client).await, r#"[{"source":"LOG","time":0.0,"value":"after"}]"#);

    // while a logging consumer still got all three
    let kinds: Vec<String> = log_stream.take(3).map(|t| t.kind().to_string()).collect().await;
    assert_eq!(kinds, ["PING", "LOOP", "LOG"]);

    cancel.cancel();
}

#[tokio::test]
async fn serial_bytes_reach_clients() {
    let fanout = Fanout::new();
    let cancel = CancellationToken::new();
    let addr = start_server(&fanout, &cancel).await;

    let mut client = connect(addr, "/").await;
    wait_for_consumers(&fanout, 1).await;

    let mut pipeline = Pipeline::new(fanout.clone());
    let mut bytes = encode_transmission(0, "LOOP", "lastLoopStart=1000000", 64);
    bytes.extend(encode_transmission(1, "LOOP", "lastLoopStart=3500000", 64));
    bytes.extend(encode_transmission(2, "IMU", "ax=0.5\tay=-1\taz=9.8", 6));

    // Arrives split across reads, as it would from the port
    let (head, tail) = bytes.split_at(bytes.len() / 2);
    pipeline.ingest(head);
    pipeline.ingest(tail);

    assert_eq!(
        next_text(&mut client).await,
        r#"[{"source":"ax","time":2.5,"value":0.5},{"source":"ay","time":2.5,"value":-1.0},{"source":"az","time":2.5,"value":9.8}]"#
    );

    cancel.cancel();
}

#[tokio::test]
async fn departed_client_does_not_affect_others() {
    let fanout = Fanout::new();
    let cancel = CancellationToken::new();
    let addr = start_server(&fanout, &cancel).await;

    let mut staying = connect(addr, "/").await;
    let mut leaving = connect(addr, "/").await;
    wait_for_consumers(&fanout, 2).await;

    leaving.close(None).await.unwrap();
    drop(leaving);

    for n in 0..5u8 {
        fanout.publish(Transmission::new(n, TransmissionType::Gridfin, format!("angle={}", n), 0.0));
    }

    for n in 0..5u8 {
        let json = next_text(&mut staying).await;
        assert_eq!(json, format!(r#"[{{"source":"GRIDFIN","time":0.0,"value":{}.0}}]"#, n));
    }

    cancel.cancel();
}
