//! DNS-over-HTTPS listener.
//!
//! Routes:
//! * `/dns-query`: RFC 8484, `GET ?dns=` and `POST application/dns-message`
//! * `/resolve`: JSON API, `GET ?name=&type=`
//! * the configured path, when it is neither of those: picks the format from
//!   the request (`dns` parameter or POST body means wire, `name` means JSON)

use crate::dns::json::{JsonMessage, DNS_JSON_CONTENT_TYPE};
use crate::dns::client::rfc8484::DNS_MESSAGE_CONTENT_TYPE;
use crate::dns::wire::{decode, encode};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use dohgate_application::services::{
    append_client_subnet, build_query, error_response, min_answer_ttl,
};
use dohgate_application::use_cases::ForwardQueryUseCase;
use dohgate_domain::{DomainError, EcsSubnet, RecordType, DNS_QUERY_PATH, RESOLVE_PATH};
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};
use url::{Host, Url};

const TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
struct DohState {
    forward: Arc<ForwardQueryUseCase>,
}

#[derive(Debug, Default, Deserialize)]
struct DohParams {
    dns: Option<String>,
    name: Option<String>,
    #[serde(rename = "type")]
    record_type: Option<String>,
    edns_client_subnet: Option<String>,
    cd: Option<String>,
}

/// Request-level failures answered with an HTTP error status.
#[derive(Debug)]
pub enum DohError {
    BadRequest(String),
    UnsupportedMediaType(String),
}

impl From<DomainError> for DohError {
    fn from(err: DomainError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl IntoResponse for DohError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            DohError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            DohError::UnsupportedMediaType(m) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, m),
        };
        debug!(status = status.as_u16(), reason = %message, "Rejected DoH request");
        (status, message).into_response()
    }
}

/// Builds the DoH router. `custom_path` adds a content-negotiated route.
pub fn router(forward: Arc<ForwardQueryUseCase>, custom_path: Option<&str>) -> Router {
    let mut router = Router::new()
        .route(DNS_QUERY_PATH, get(wire_get).post(wire_post))
        .route(RESOLVE_PATH, get(json_get));

    if let Some(path) = custom_path.filter(|p| !matches!(*p, "" | "/" | DNS_QUERY_PATH | RESOLVE_PATH)) {
        router = router.route(path, get(negotiated_get).post(wire_post));
    }

    router.with_state(DohState { forward })
}

async fn wire_get(
    State(state): State<DohState>,
    Query(params): Query<DohParams>,
) -> Result<Response, DohError> {
    let encoded = params
        .dns
        .ok_or_else(|| DohError::BadRequest("missing dns parameter".to_string()))?;
    let raw = URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|e| DohError::BadRequest(format!("invalid base64url: {}", e)))?;

    answer_wire(&state, &raw).await
}

async fn wire_post(
    State(state): State<DohState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, DohError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with(DNS_MESSAGE_CONTENT_TYPE) {
        return Err(DohError::UnsupportedMediaType(format!(
            "expected {}",
            DNS_MESSAGE_CONTENT_TYPE
        )));
    }

    answer_wire(&state, &body).await
}

async fn json_get(
    State(state): State<DohState>,
    Query(params): Query<DohParams>,
) -> Result<Response, DohError> {
    answer_json(&state, params).await
}

async fn negotiated_get(
    State(state): State<DohState>,
    Query(params): Query<DohParams>,
) -> Result<Response, DohError> {
    if params.dns.is_some() {
        wire_get(State(state), Query(params)).await
    } else if params.name.is_some() {
        answer_json(&state, params).await
    } else {
        Err(DohError::BadRequest("expected a dns or name parameter".to_string()))
    }
}

async fn answer_wire(state: &DohState, raw: &[u8]) -> Result<Response, DohError> {
    let query = decode(raw)?;
    if query.message_type() != MessageType::Query || query.queries().is_empty() {
        return Err(DohError::BadRequest("not a DNS query".to_string()));
    }

    let response = state.forward.execute(&query).await;
    let bytes = match encode(&response) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, id = query.id(), "Failed to encode DoH reply, sending SERVFAIL");
            encode(&error_response(&query, ResponseCode::ServFail))?
        }
    };

    let mut reply = (
        [(header::CONTENT_TYPE, HeaderValue::from_static(DNS_MESSAGE_CONTENT_TYPE))],
        bytes,
    )
        .into_response();
    if let Some(ttl) = min_answer_ttl(&response) {
        if let Ok(value) = HeaderValue::from_str(&format!("max-age={}", ttl)) {
            reply.headers_mut().insert(header::CACHE_CONTROL, value);
        }
    }
    Ok(reply)
}

async fn answer_json(state: &DohState, params: DohParams) -> Result<Response, DohError> {
    let query = json_query(params)?;
    let response = state.forward.execute(&query).await;

    let body = JsonMessage::from_answer(&query, &response).to_vec()?;
    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(DNS_JSON_CONTENT_TYPE))],
        body,
    )
        .into_response())
}

fn json_query(params: DohParams) -> Result<Message, DohError> {
    let name = params
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| DohError::BadRequest("missing name parameter".to_string()))?;
    let record_type = match params.record_type.as_deref() {
        Some(t) if !t.is_empty() => RecordType::from_mnemonic_or_code(t)?,
        _ => RecordType::A,
    };

    let mut query = build_query(&name, record_type)?;
    if let Some(subnet) = params.edns_client_subnet.filter(|s| !s.is_empty()) {
        let subnet: EcsSubnet = subnet.parse()?;
        append_client_subnet(&mut query, &subnet);
    }
    if matches!(params.cd.as_deref(), Some("1" | "true")) {
        query.set_checking_disabled(true);
    }
    Ok(query)
}

pub struct DohServer {
    url: String,
    bind_addr: SocketAddr,
    path: String,
    tls: Option<Arc<rustls::ServerConfig>>,
    forward: Arc<ForwardQueryUseCase>,
}

impl DohServer {
    /// `tls` is required for `https` URLs and ignored for `http`.
    pub fn new(
        url: &str,
        tls: Option<Arc<rustls::ServerConfig>>,
        forward: Arc<ForwardQueryUseCase>,
    ) -> Result<Self, DomainError> {
        let parsed = Url::parse(url).map_err(|e| DomainError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let tls = match parsed.scheme() {
            "https" => Some(tls.ok_or_else(|| {
                DomainError::ConfigError(format!("{} needs certfile and keyfile", url))
            })?),
            "http" => None,
            other => return Err(DomainError::UnsupportedScheme(other.to_string())),
        };

        let ip: IpAddr = match parsed.host() {
            Some(Host::Ipv4(ip)) => ip.into(),
            Some(Host::Ipv6(ip)) => ip.into(),
            _ => {
                return Err(DomainError::InvalidUrl {
                    url: url.to_string(),
                    reason: "listener host must be an IP address".to_string(),
                })
            }
        };
        let port = parsed.port_or_known_default().unwrap_or(443);

        Ok(Self {
            url: url.to_string(),
            bind_addr: SocketAddr::new(ip, port),
            path: parsed.path().to_string(),
            tls,
            forward,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn router(&self) -> Router {
        router(self.forward.clone(), Some(&self.path))
    }

    pub async fn bind(&self) -> Result<BoundDohServer, DomainError> {
        let bind_error = |e: std::io::Error| DomainError::Bind {
            addr: self.bind_addr.to_string(),
            reason: e.to_string(),
        };
        let listener = TcpListener::bind(self.bind_addr).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        info!(
            bind_address = %local_addr,
            tls = self.tls.is_some(),
            path = %self.path,
            upstream = %self.forward.upstream(),
            "DoH listener ready"
        );

        Ok(BoundDohServer {
            listener,
            local_addr,
            acceptor: self.tls.clone().map(TlsAcceptor::from),
            app: self.router(),
        })
    }

    pub async fn run(&self) -> Result<(), DomainError> {
        self.bind().await?.serve().await
    }
}

pub struct BoundDohServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    acceptor: Option<TlsAcceptor>,
    app: Router,
}

impl BoundDohServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn serve(self) -> Result<(), DomainError> {
        let Some(acceptor) = self.acceptor else {
            return axum::serve(self.listener, self.app)
                .await
                .map_err(|e| DomainError::from_io(self.local_addr.to_string(), &e));
        };

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "Failed to accept connection");
                    continue;
                }
            };

            let acceptor = acceptor.clone();
            let service = TowerToHyperService::new(self.app.clone());
            tokio::spawn(async move {
                let tls = match tokio::time::timeout(TLS_HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await {
                    Ok(Ok(tls)) => tls,
                    Ok(Err(e)) => {
                        debug!(client = %peer, error = %e, "TLS handshake failed");
                        return;
                    }
                    Err(_) => {
                        debug!(client = %peer, "TLS handshake timed out");
                        return;
                    }
                };

                if let Err(e) = auto::Builder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(tls), service)
                    .await
                {
                    debug!(client = %peer, error = %e, "DoH connection closed with error");
                }
            });
        }
    }
}
