#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};

/// A request as received by the fake OpenTSDB.
#[derive(Clone, Debug)]
pub struct Received {
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

/// An in-process stand-in for OpenTSDB's `/api/query` that answers every
/// request with the same canned response.
#[derive(Clone)]
pub struct FakeOpenTsdb {
    status: StatusCode,
    body: String,
    delay: Duration,
    received: Arc<Mutex<Vec<Received>>>,
}

impl FakeOpenTsdb {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
            delay: Duration::from_millis(0),
            received: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn ok(body: &str) -> Self {
        Self::new(200, body)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    /// Serves under `prefix` on a random local port and returns the base
    /// URL to point a client at.
    pub async fn start_at(&self, prefix: &str) -> String {
        let path = format!("{}/api/query", prefix.trim_end_matches('/'));
        let app = Router::new()
            .route(&path, post(handle))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}{}", addr, prefix)
    }

    pub async fn start(&self) -> String {
        self.start_at("").await
    }
}

async fn handle(
    State(fake): State<FakeOpenTsdb>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, [(&'static str, &'static str); 1], String) {
    let body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    fake.received
        .lock()
        .unwrap()
        .push(Received { headers, body });

    if fake.delay > Duration::from_millis(0) {
        tokio::time::sleep(fake.delay).await;
    }

    (
        fake.status,
        [("content-type", "application/json")],
        fake.body.clone(),
    )
}
