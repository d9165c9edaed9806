//! Shared E2E helpers: a local mock analysis endpoint.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;

/// A running mock analysis endpoint. Every request body it received is kept
/// for assertions.
#[derive(Clone)]
pub struct MockEndpoint {
    pub url: String,
    pub seen: Arc<Mutex<Vec<Value>>>,
}

impl MockEndpoint {
    pub fn request_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn last_body(&self) -> Value {
        self.seen
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("endpoint saw no request")
    }
}

#[derive(Clone)]
struct HandlerState {
    status: u16,
    reply: &'static str,
    seen: Arc<Mutex<Vec<Value>>>,
}

async fn handle(
    State(state): State<HandlerState>,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    state.seen.lock().unwrap().push(body);
    (
        StatusCode::from_u16(state.status).unwrap(),
        state.reply.to_string(),
    )
}

/// Spawn an endpoint on an ephemeral port answering `/process` with the given
/// status and body.
pub fn spawn_endpoint(status: u16, reply: &'static str) -> MockEndpoint {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let state = HandlerState {
        status,
        reply,
        seen: Arc::clone(&seen),
    };
    let (addr_tx, addr_rx) = std::sync::mpsc::channel::<SocketAddr>();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let app = Router::new()
                .route("/process", post(handle))
                .with_state(state);
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .unwrap();
            addr_tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });

    let addr = addr_rx.recv().unwrap();
    MockEndpoint {
        url: format!("http://{addr}/process"),
        seen,
    }
}
