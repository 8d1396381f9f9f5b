//! Mock indexing backend served by axum on an ephemeral port.

#![allow(dead_code)]

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What the mock answers and what it has received.
#[derive(Default)]
pub struct MockBackend {
    pub index_name: String,
    pub answer: String,
    /// The first N createIndex calls return HTTP 500.
    pub failing_creates: usize,
    pub fail_updates: bool,
    /// queryIndex replies with a body that is not JSON.
    pub garbage_answers: bool,
    pub creates: AtomicUsize,
    pub uploads: Mutex<Vec<Upload>>,
    pub queries: Mutex<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub index_name: Option<String>,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl MockBackend {
    pub fn answering(index_name: &str, answer: &str) -> Self {
        Self {
            index_name: index_name.to_string(),
            answer: answer.to_string(),
            ..Self::default()
        }
    }

    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<Value> {
        self.queries.lock().unwrap().clone()
    }
}

/// Serve `mock` on 127.0.0.1 and return its base URL.
pub async fn serve(mock: Arc<MockBackend>) -> String {
    let app = Router::new()
        .route("/api/createIndex", post(create_index))
        .route("/api/updateIndex", post(update_index))
        .route("/api/queryIndex", post(query_index))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A base URL nothing is listening on.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn create_index(State(mock): State<Arc<MockBackend>>) -> Response {
    let n = mock.creates.fetch_add(1, Ordering::SeqCst);
    if n < mock.failing_creates {
        return (StatusCode::INTERNAL_SERVER_ERROR, "index service down").into_response();
    }
    Json(json!({ "indexName": mock.index_name })).into_response()
}

async fn update_index(
    State(mock): State<Arc<MockBackend>>,
    mut multipart: Multipart,
) -> StatusCode {
    let mut upload = Upload {
        index_name: None,
        file_name: None,
        bytes: Vec::new(),
    };
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "indexName" => upload.index_name = Some(field.text().await.unwrap()),
            "file" => {
                upload.file_name = field.file_name().map(|s| s.to_string());
                upload.bytes = field.bytes().await.unwrap().to_vec();
            }
            _ => {}
        }
    }
    mock.uploads.lock().unwrap().push(upload);

    if mock.fail_updates {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    }
}

async fn query_index(State(mock): State<Arc<MockBackend>>, Json(body): Json<Value>) -> Response {
    mock.queries.lock().unwrap().push(body);
    if mock.garbage_answers {
        return "<html>oops</html>".into_response();
    }
    Json(json!({ "answer": mock.answer })).into_response()
}
