//! In-process stand-ins for the backend and the rendering surface.

use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use axum::extract::Extension;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tokio::sync::Notify;

use crate::presenter::{Status, Surface};

#[derive(Debug, Clone)]
pub struct Hit {
    pub method: Method,
    pub uri: String,
    pub body: String,
    headers: HeaderMap,
}

impl Hit {
    pub fn path(&self) -> &str {
        self.uri.split('?').next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

/// Canned answers per endpoint. `config: None` answers `/config` with the
/// mock's own address. With `mark_gate` set, `/mark_attendance` holds its
/// answer until the gate is notified.
#[derive(Debug, Clone)]
pub struct Replies {
    pub config: Option<(StatusCode, String)>,
    pub root: (StatusCode, String),
    pub generate: (StatusCode, String),
    pub qr: (StatusCode, Vec<u8>),
    pub mark: (StatusCode, String),
    pub mark_gate: Option<Arc<Notify>>,
}

impl Default for Replies {
    fn default() -> Self {
        Self {
            config: None,
            root: (
                StatusCode::OK,
                r#"{"message":"Backend is running!"}"#.to_string(),
            ),
            generate: (
                StatusCode::OK,
                r#"{"status":"success","token":"abc123","subject":"Algorithms","expires_in":120}"#
                    .to_string(),
            ),
            qr: (StatusCode::OK, vec![0x89, 0x50, 0x4e]),
            mark: (
                StatusCode::OK,
                r#"{"status":"success","message":"Marked!"}"#.to_string(),
            ),
            mark_gate: None,
        }
    }
}

struct Mock {
    origin: String,
    replies: Replies,
    hits: Mutex<Vec<Hit>>,
}

pub struct MockBackend {
    pub origin: String,
    mock: Arc<Mock>,
}

impl MockBackend {
    pub async fn spawn(replies: Replies) -> MockBackend {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let origin = format!("http://{}", listener.local_addr().unwrap());

        let mock = Arc::new(Mock {
            origin: origin.clone(),
            replies,
            hits: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/", any(answer))
            .route("/config", any(answer))
            .route("/generate_token", any(answer))
            .route("/get_qr", any(answer))
            .route("/mark_attendance", any(answer))
            .layer(Extension(mock.clone()));

        let server = axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service());
        tokio::spawn(server);

        MockBackend { origin, mock }
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.mock.hits.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.hits().iter().map(|h| h.path().to_string()).collect()
    }
}

async fn answer(
    Extension(mock): Extension<Arc<Mock>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    mock.hits.lock().unwrap().push(Hit {
        method,
        uri: uri.to_string(),
        body,
        headers,
    });

    let replies = &mock.replies;
    match uri.path() {
        "/config" => match &replies.config {
            Some((code, body)) => (*code, body.clone()).into_response(),
            None => (
                StatusCode::OK,
                serde_json::json!({ "backend_url": mock.origin }).to_string(),
            )
                .into_response(),
        },
        "/generate_token" => replies.generate.clone().into_response(),
        "/get_qr" => replies.qr.clone().into_response(),
        "/mark_attendance" => {
            if let Some(gate) = &replies.mark_gate {
                gate.notified().await;
            }
            replies.mark.clone().into_response()
        }
        _ => replies.root.clone().into_response(),
    }
}

/// An address nothing is listening on.
pub fn dead_origin() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Remembers every render in order.
#[derive(Default)]
pub struct Recording {
    timers: Mutex<Vec<String>>,
    statuses: Mutex<Vec<Option<Status>>>,
}

impl Recording {
    pub fn timers(&self) -> Vec<String> {
        self.timers.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<Option<Status>> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.statuses()
            .into_iter()
            .flatten()
            .map(|s| s.message)
            .collect()
    }
}

impl Surface for Recording {
    fn render_timer(&self, text: &str) {
        self.timers.lock().unwrap().push(text.to_string());
    }

    fn render_status(&self, status: Option<&Status>) {
        self.statuses.lock().unwrap().push(status.cloned());
    }
}
