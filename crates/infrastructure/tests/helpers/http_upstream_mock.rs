use super::dns_server_mock::{answer_for, MOCK_ANSWER};
use axum::extract::{Query, RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hickory_proto::op::Message;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

#[derive(Clone)]
struct UpstreamState {
    requests: Arc<Mutex<Vec<String>>>,
    status: StatusCode,
}

/// JSON (`/resolve`) and RFC 8484 (`/dns-query`) upstream recording the
/// query string of every request.
pub struct MockHttpUpstream {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl MockHttpUpstream {
    pub async fn start() -> Self {
        Self::start_with_status(StatusCode::OK).await
    }

    /// Every request is answered with `status`; non-2xx statuses carry no DNS body.
    pub async fn start_with_status(status: StatusCode) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = UpstreamState {
            requests: requests.clone(),
            status,
        };
        let app = Router::new()
            .route("/resolve", get(resolve))
            .route("/dns-query", get(dns_query))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, requests, task }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockHttpUpstream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn record(state: &UpstreamState, raw: Option<String>) {
    state.requests.lock().unwrap().push(raw.unwrap_or_default());
}

async fn resolve(
    State(state): State<UpstreamState>,
    RawQuery(raw): RawQuery,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    record(&state, raw);
    if !state.status.is_success() {
        return state.status.into_response();
    }

    let name = params.get("name").cloned().unwrap_or_default();
    let body = json!({
        "Status": 0,
        "TC": false, "RD": true, "RA": true, "AD": false, "CD": false,
        "Question": [{ "name": name, "type": 1 }],
        "Answer": [
            { "name": name, "type": 1, "TTL": 300, "data": MOCK_ANSWER.to_string() },
            { "name": name, "type": 13, "TTL": 300, "data": "\"cpu\" \"os\"" }
        ]
    });
    ([(header::CONTENT_TYPE, "application/dns-json")], body.to_string()).into_response()
}

async fn dns_query(
    State(state): State<UpstreamState>,
    RawQuery(raw): RawQuery,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    record(&state, raw);
    if !state.status.is_success() {
        return state.status.into_response();
    }

    let Some(query) = params
        .get("dns")
        .and_then(|dns| URL_SAFE_NO_PAD.decode(dns).ok())
        .and_then(|bytes| Message::from_vec(&bytes).ok())
    else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let body = answer_for(&query, MOCK_ANSWER).to_vec().unwrap();
    ([(header::CONTENT_TYPE, "application/dns-message")], body).into_response()
}

/// Decodes the `dns` parameter of a recorded RFC 8484 query string.
pub fn decode_dns_param(raw_query: &str) -> Message {
    let encoded = raw_query
        .split('&')
        .find_map(|pair| pair.strip_prefix("dns="))
        .expect("request has a dns parameter");
    Message::from_vec(&URL_SAFE_NO_PAD.decode(encoded).unwrap()).unwrap()
}
