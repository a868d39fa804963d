use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use batchchat_core::{
    ChatConfig, ChatError, ChatMessage, CompletionStreamClient, Conversation, FanoutOrchestrator,
    HttpCompletionService, ImageData, NoopObserver,
};
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct TestState {
    bodies: Arc<Mutex<Vec<Value>>>,
}

fn first_image(body: &Value) -> String {
    body["messages"][0]["content"][0]["image"]
        .as_str()
        .unwrap_or("none")
        .to_string()
}

/// Streams `Hello <image>` split awkwardly across chunks, surrounded by metadata frames.
async fn chat_handler(State(state): State<TestState>, Json(body): Json<Value>) -> Response {
    let image = first_image(&body);
    state.bodies.lock().unwrap().push(body);

    let tail = format!("0:{}\ne:{{\"finishReason\":\"stop\"}}\n", json!(format!(" {}", image)));
    let chunks = vec![
        "f:{\"messageId\":\"msg-1\"}\n0:\"Hel".to_string(),
        "\"\n0:\"lo\"\n".to_string(),
        tail,
    ];
    let body = stream::iter(chunks).then(|chunk| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok::<_, std::io::Error>(chunk)
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header("x-vercel-ai-data-stream", "v1")
        .body(Body::from_stream(body))
        .unwrap()
}

async fn failing_handler() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

/// Error status whose body aborts before it is complete.
async fn broken_error_handler() -> Response {
    let body = stream::iter(vec![
        Ok::<_, std::io::Error>("partial error".to_string()),
        Err(std::io::Error::new(std::io::ErrorKind::Other, "connection dropped")),
    ]);

    Response::builder()
        .status(StatusCode::BAD_GATEWAY)
        .body(Body::from_stream(body))
        .unwrap()
}

async fn garbled_handler() -> impl IntoResponse {
    "0:\"fine\"\n0:oops\n"
}

async fn spawn_server(state: TestState) -> SocketAddr {
    let app = Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/fail", post(failing_handler))
        .route("/garbled", post(garbled_handler))
        .route("/broken-error", post(broken_error_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test app");
    });
    addr
}

fn service(addr: SocketAddr, path: &str) -> HttpCompletionService {
    let config = ChatConfig {
        endpoint: Some(format!("http://{}{}", addr, path)),
        ..ChatConfig::default()
    };
    HttpCompletionService::new(&config).expect("valid endpoint")
}

fn history() -> Vec<ChatMessage> {
    vec![
        ChatMessage::user_image(&ImageData::new(vec![0], Some("image/png".to_string()))),
        ChatMessage::user("What is this?"),
    ]
}

#[tokio::test]
async fn streams_cumulative_text_over_http() {
    let state = TestState::default();
    let addr = spawn_server(state.clone()).await;
    let client = CompletionStreamClient::new(service(addr, "/api/chat"));

    let mut updates = Vec::new();
    let answer = client
        .open(&history(), |text| {
            updates.push(text.to_string());
            Ok(())
        })
        .await
        .expect("stream completes");

    assert_eq!(updates, vec!["Hel", "Hello", "Hello AA=="]);
    assert_eq!(answer, "Hello AA==");

    let bodies = state.bodies.lock().unwrap();
    assert_eq!(
        bodies[0],
        json!({
            "messages": [
                {
                    "role": "user",
                    "content": [{ "type": "image", "image": "AA==", "mimeType": "image/png" }]
                },
                { "role": "user", "content": "What is this?" }
            ]
        })
    );
}

#[tokio::test]
async fn sends_configured_generation_parameters() {
    let state = TestState::default();
    let addr = spawn_server(state.clone()).await;
    let config = ChatConfig {
        endpoint: Some(format!("http://{}/api/chat", addr)),
        temperature: Some(0.25),
        max_tokens: Some(128),
        ..ChatConfig::default()
    };
    let client = CompletionStreamClient::new(HttpCompletionService::new(&config).unwrap());

    client.open(&history(), |_| Ok(())).await.unwrap();

    let bodies = state.bodies.lock().unwrap();
    assert_eq!(bodies[0]["temperature"], json!(0.25));
    assert_eq!(bodies[0]["maxTokens"], json!(128));
}

#[tokio::test]
async fn non_success_status_is_status_error() {
    let addr = spawn_server(TestState::default()).await;
    let client = CompletionStreamClient::new(service(addr, "/fail"));

    let result = client.open(&history(), |_| Ok(())).await;
    match result {
        Err(ChatError::Status {
            status_code,
            message,
        }) => {
            assert_eq!(status_code, 500);
            assert!(message.contains("boom"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn unreadable_error_body_still_reports_status() {
    let addr = spawn_server(TestState::default()).await;
    let client = CompletionStreamClient::new(service(addr, "/broken-error"));

    let result = client.open(&history(), |_| Ok(())).await;
    assert!(matches!(
        result,
        Err(ChatError::Status {
            status_code: 502,
            ..
        })
    ));
}

#[tokio::test]
async fn malformed_frame_is_protocol_error() {
    let addr = spawn_server(TestState::default()).await;
    let client = CompletionStreamClient::new(service(addr, "/garbled"));

    let mut updates = Vec::new();
    let result = client
        .open(&history(), |text| {
            updates.push(text.to_string());
            Ok(())
        })
        .await;

    assert!(matches!(result, Err(ChatError::Protocol(_))));
    assert_eq!(updates, vec!["fine"]);
}

#[tokio::test]
async fn refused_connection_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = CompletionStreamClient::new(service(addr, "/api/chat"));

    let result = client.open(&history(), |_| Ok(())).await;
    assert!(matches!(result, Err(ChatError::Transport(_))));
}

#[tokio::test]
async fn fans_out_one_request_per_image() {
    let state = TestState::default();
    let addr = spawn_server(state.clone()).await;
    let orchestrator = FanoutOrchestrator::new(service(addr, "/api/chat"));

    let images = vec![
        ImageData::new(vec![0], Some("image/png".to_string())),
        ImageData::new(vec![1], Some("image/jpeg".to_string())),
    ];
    let mut conversation = Conversation::new(images).unwrap();
    let turn = conversation.append_question("What is this?").unwrap();

    orchestrator
        .dispatch(&mut conversation, turn, &NoopObserver)
        .await
        .expect("both slots complete");

    assert_eq!(
        conversation.assistant_turn(turn).unwrap().texts(),
        vec!["Hello AA==", "Hello AQ=="]
    );

    let bodies = state.bodies.lock().unwrap();
    assert_eq!(bodies.len(), 2);
    let mut images: Vec<String> = bodies.iter().map(first_image).collect();
    images.sort();
    assert_eq!(images, vec!["AA==", "AQ=="]);
    for body in bodies.iter() {
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(body["messages"][1]["content"], json!("What is this?"));
    }
}
