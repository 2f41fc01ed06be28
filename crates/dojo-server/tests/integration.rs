//! End-to-end tests against a real listener with a WebSocket client.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use dojo_core::session::{Mode, SessionDefaults};
use dojo_core::upstream::TriageResult;
use dojo_server::{start, BridgeContext, Collaborators, ServerConfig, ServerHandle, VoiceDefaults};
use dojo_upstream::mock::{MockPersona, MockSpeech, MockSynthesizer, RecordingScoreSink, StaticTriage};

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

struct Bridge {
    handle: ServerHandle,
    scoring: Arc<RecordingScoreSink>,
    synth: Arc<MockSynthesizer>,
}

impl Bridge {
    async fn boot(persona: MockPersona, synth: MockSynthesizer) -> Self {
        let synth = Arc::new(synth);
        let scoring = Arc::new(RecordingScoreSink::new(None));
        let ctx = Arc::new(BridgeContext {
            collaborators: Collaborators {
                triage: Arc::new(StaticTriage::new(TriageResult {
                    action: "COMBAT_RING".into(),
                    multiplier: Some("5x".into()),
                    persona_suggestion: None,
                })),
                persona: Arc::new(persona),
                synthesizer: synth.clone(),
                scoring: scoring.clone(),
            },
            voice: VoiceDefaults {
                voice_id: Some("voice-1".into()),
                model_id: "eleven_monolingual_v1".into(),
            },
            session_defaults: SessionDefaults::default(),
        });
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            ..Default::default()
        };
        let handle = start(config, ctx).await.unwrap();
        Self {
            handle,
            scoring,
            synth,
        }
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.handle.port, path)
    }

    async fn connect(&self) -> WsStream {
        let url = format!("ws://127.0.0.1:{}/ws/stream", self.handle.port);
        let (ws, _) = connect_async(url).await.unwrap();
        ws
    }
}

enum Frame {
    Audio(Bytes),
    Json(Value),
}

async fn next_frame(ws: &mut WsStream) -> Frame {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .unwrap();
        match msg {
            Message::Binary(data) => return Frame::Audio(data),
            Message::Text(text) => return Frame::Json(serde_json::from_str(&text).unwrap()),
            _ => continue,
        }
    }
}

async fn next_json(ws: &mut WsStream) -> Value {
    loop {
        if let Frame::Json(v) = next_frame(ws).await {
            return v;
        }
    }
}

async fn send(ws: &mut WsStream, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

#[tokio::test]
async fn health_endpoint() {
    let bridge = Bridge::boot(MockPersona::default(), MockSynthesizer::new(vec![])).await;
    let body: Value = reqwest::get(bridge.http_url("/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "dojo-bridge");
}

#[tokio::test]
async fn combat_cycle_streams_audio_then_done() {
    let bridge = Bridge::boot(
        MockPersona::replying("Oh dear, is this about my grandson?"),
        MockSynthesizer::new(vec![MockSpeech::chunks(&[b"ID3", b"\xff\xfb", b"\xff\xfb"])]),
    )
    .await;
    let mut ws = bridge.connect().await;

    send(
        &mut ws,
        json!({"action": "combat", "caller_number": "555-0000", "transcript": "IRS here", "persona": "hazel"}),
    )
    .await;

    let streaming = next_json(&mut ws).await;
    assert_eq!(streaming["status"], "streaming");
    assert_eq!(streaming["actor_text"], "Oh dear, is this about my grandson?");

    let mut audio = Vec::new();
    let done = loop {
        match next_frame(&mut ws).await {
            Frame::Audio(chunk) => audio.push(chunk),
            Frame::Json(v) => break v,
        }
    };
    assert_eq!(audio.len(), 3);
    assert_eq!(audio[0], Bytes::from_static(b"ID3"));
    assert_eq!(done["status"], "done");

    send(&mut ws, json!({"action": "end_session"})).await;
    let scored = next_json(&mut ws).await;
    assert_eq!(scored["status"], "session_scored");
    assert_eq!(scored["live_seconds"], 0.0);
    assert_eq!(scored["auto_seconds"], scored["total_duration"]);
}

#[tokio::test]
async fn barge_in_interrupts_in_flight_stream() {
    let chunks = (0..50).map(|_| Bytes::from_static(b"frame")).collect();
    let bridge = Bridge::boot(
        MockPersona::default(),
        MockSynthesizer::new(vec![
            MockSpeech::Paced {
                chunks,
                interval: Duration::from_millis(40),
            },
            MockSpeech::chunks(&[b"after"]),
        ]),
    )
    .await;
    let mut ws = bridge.connect().await;

    send(&mut ws, json!({"action": "tts", "text": "a very long story"})).await;
    assert!(matches!(next_frame(&mut ws).await, Frame::Audio(_)));
    send(&mut ws, json!({"action": "barge_in", "user_id": "sensei"})).await;

    let mut delivered = 1;
    let interrupted = loop {
        match next_frame(&mut ws).await {
            Frame::Audio(_) => delivered += 1,
            Frame::Json(v) => break v,
        }
    };
    assert_eq!(interrupted["status"], "stream_interrupted");
    assert_eq!(interrupted["reason"], "barge_in");
    assert!(delivered < 50, "stream was not interrupted early: {delivered}");

    let ack = next_json(&mut ws).await;
    assert_eq!(ack["status"], "barge_in_ack");
    assert_eq!(ack["mode"], "live");

    send(&mut ws, json!({"action": "tts", "text": "next"})).await;
    assert!(matches!(next_frame(&mut ws).await, Frame::Audio(_)));
    assert_eq!(next_json(&mut ws).await["status"], "done");
    assert_eq!(bridge.synth.call_count(), 2);
}

#[tokio::test]
async fn bad_message_keeps_connection_open() {
    let bridge = Bridge::boot(MockPersona::default(), MockSynthesizer::new(vec![])).await;
    let mut ws = bridge.connect().await;

    ws.send(Message::Text("{not json".into())).await.unwrap();
    let err = next_json(&mut ws).await;
    assert!(err["error"].as_str().unwrap().starts_with("invalid JSON"));

    send(&mut ws, json!({"action": "warp"})).await;
    assert_eq!(next_json(&mut ws).await["error"], "unknown action: warp");

    send(&mut ws, json!({"action": "barge_in"})).await;
    assert_eq!(next_json(&mut ws).await["status"], "barge_in_ack");
}

#[tokio::test]
async fn disconnect_while_live_scores_once() {
    let bridge = Bridge::boot(MockPersona::default(), MockSynthesizer::new(vec![])).await;
    let mut ws = bridge.connect().await;

    send(&mut ws, json!({"action": "barge_in", "user_id": "sensei"})).await;
    assert_eq!(next_json(&mut ws).await["status"], "barge_in_ack");
    tokio::time::sleep(Duration::from_millis(50)).await;
    ws.close(None).await.unwrap();
    drop(ws);

    let scoring = bridge.scoring.clone();
    timeout(TIMEOUT, async move {
        while scoring.reports().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("no score report after disconnect");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let reports = bridge.scoring.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].mode, Mode::Live);
    assert_eq!(reports[0].user_id, "sensei");
}

#[tokio::test]
async fn disconnect_mid_stream_ends_and_scores_live_session() {
    let chunks = (0..50).map(|_| Bytes::from_static(b"frame")).collect();
    let bridge = Bridge::boot(
        MockPersona::default(),
        MockSynthesizer::new(vec![MockSpeech::Paced {
            chunks,
            interval: Duration::from_millis(40),
        }]),
    )
    .await;
    let mut ws = bridge.connect().await;

    send(&mut ws, json!({"action": "barge_in", "user_id": "sensei"})).await;
    assert_eq!(next_json(&mut ws).await["status"], "barge_in_ack");
    send(&mut ws, json!({"action": "tts", "text": "a very long story"})).await;
    assert!(matches!(next_frame(&mut ws).await, Frame::Audio(_)));
    drop(ws);

    let scoring = bridge.scoring.clone();
    timeout(TIMEOUT, async move {
        while scoring.reports().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("no score report after mid-stream disconnect");
    tokio::time::sleep(Duration::from_millis(200)).await;

    let reports = bridge.scoring.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].mode, Mode::Live);
    assert_eq!(reports[0].user_id, "sensei");
}

#[tokio::test]
async fn rest_tts_returns_buffered_audio() {
    let bridge = Bridge::boot(
        MockPersona::default(),
        MockSynthesizer::new(vec![MockSpeech::chunks(&[b"ab", b"cd"])]),
    )
    .await;
    let resp = reqwest::Client::new()
        .post(bridge.http_url("/tts"))
        .json(&json!({"text": "hello"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "audio/mpeg");
    assert_eq!(resp.bytes().await.unwrap(), Bytes::from_static(b"abcd"));
}

#[tokio::test]
async fn rest_tts_without_credentials_is_server_error() {
    let bridge = Bridge::boot(MockPersona::default(), MockSynthesizer::unconfigured()).await;
    let resp = reqwest::Client::new()
        .post(bridge.http_url("/tts"))
        .json(&json!({"text": "hello"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("not configured"));
}

#[tokio::test]
async fn rest_combat_returns_text_and_hint() {
    let bridge = Bridge::boot(MockPersona::replying("Who is this?"), MockSynthesizer::new(vec![])).await;
    let body: Value = reqwest::Client::new()
        .post(bridge.http_url("/combat"))
        .json(&json!({"caller_number": "555-0000", "transcript": "hello"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["triage"]["action"], "COMBAT_RING");
    assert_eq!(body["actor_response"], "Who is this?");
    assert_eq!(body["persona"], "hazel");
    assert!(body["hint"].as_str().unwrap().contains("/ws/stream"));
}
