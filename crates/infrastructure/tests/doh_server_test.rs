use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use dohgate_application::ports::{DnsClient, ExchangeContext};
use dohgate_application::services::build_query;
use dohgate_application::use_cases::ForwardQueryUseCase;
use dohgate_domain::RecordType;
use dohgate_infrastructure::dns::client::{GoogleClient, Rfc8484Client};
use dohgate_infrastructure::dns::server::doh::{router, DohServer};
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::RData;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

mod helpers;
use helpers::{StaticClient, MOCK_ANSWER};

const TIMEOUT: Duration = Duration::from_secs(5);

fn app(client: StaticClient, custom_path: Option<&str>) -> Router {
    router(Arc::new(ForwardQueryUseCase::new(Arc::new(client), TIMEOUT)), custom_path)
}

fn dns_param(query: &Message) -> String {
    URL_SAFE_NO_PAD.encode(query.to_vec().unwrap())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap().to_vec();
    (status, headers, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn first_a(message: &Message) -> Option<Ipv4Addr> {
    message.answers().iter().find_map(|r| match r.data() {
        RData::A(a) => Some(a.0),
        _ => None,
    })
}

#[tokio::test]
async fn test_get_dns_query_returns_wire_answer_with_cache_control() {
    let query = build_query("example.com", RecordType::A).unwrap();
    let uri = format!("/dns-query?dns={}", dns_param(&query));

    let (status, headers, body) = send(app(StaticClient::new(MOCK_ANSWER), None), get(&uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/dns-message");
    assert_eq!(headers[header::CACHE_CONTROL], "max-age=60");
    let answer = Message::from_vec(&body).unwrap();
    assert_eq!(answer.id(), query.id());
    assert_eq!(first_a(&answer), Some(MOCK_ANSWER));
}

#[tokio::test]
async fn test_post_dns_query_accepts_wire_body() {
    let query = build_query("example.com", RecordType::A).unwrap();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/dns-query")
        .header(header::CONTENT_TYPE, "application/dns-message")
        .body(Body::from(query.to_vec().unwrap()))
        .unwrap();

    let (status, _, body) = send(app(StaticClient::new(MOCK_ANSWER), None), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first_a(&Message::from_vec(&body).unwrap()), Some(MOCK_ANSWER));
}

#[tokio::test]
async fn test_post_with_wrong_content_type_is_415() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/dns-query")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("hello"))
        .unwrap();

    let (status, _, _) = send(app(StaticClient::new(MOCK_ANSWER), None), request).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_malformed_wire_requests_are_400() {
    for uri in ["/dns-query", "/dns-query?dns=***", "/dns-query?dns=AAAA"] {
        let (status, _, _) = send(app(StaticClient::new(MOCK_ANSWER), None), get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_resolve_returns_json_document() {
    let (status, headers, body) = send(
        app(StaticClient::new(MOCK_ANSWER), None),
        get("/resolve?name=example.com&type=A&edns_client_subnet=203.0.113.9/24"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/dns-json");
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["Status"], 0);
    assert_eq!(value["Question"][0]["name"], "example.com.");
    assert_eq!(value["Answer"][0]["data"], MOCK_ANSWER.to_string());
    assert_eq!(value["edns_client_subnet"], "203.0.113.0/24");
}

#[tokio::test]
async fn test_resolve_parameter_errors_are_400() {
    for uri in ["/resolve", "/resolve?name=example.com&type=BOGUS"] {
        let (status, _, _) = send(app(StaticClient::new(MOCK_ANSWER), None), get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_upstream_failure_is_servfail_in_request_format() {
    let (status, _, body) = send(app(StaticClient::failing(), None), get("/resolve?name=example.com")).await;
    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["Status"], 2);

    let query = build_query("example.com", RecordType::A).unwrap();
    let uri = format!("/dns-query?dns={}", dns_param(&query));
    let (status, headers, body) = send(app(StaticClient::failing(), None), get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.get(header::CACHE_CONTROL).is_none());
    assert_eq!(Message::from_vec(&body).unwrap().response_code(), ResponseCode::ServFail);
}

#[tokio::test]
async fn test_custom_path_negotiates_format() {
    let query = build_query("example.com", RecordType::A).unwrap();

    let wire_uri = format!("/custom?dns={}", dns_param(&query));
    let (status, headers, _) = send(app(StaticClient::new(MOCK_ANSWER), Some("/custom")), get(&wire_uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/dns-message");

    let (status, headers, _) = send(
        app(StaticClient::new(MOCK_ANSWER), Some("/custom")),
        get("/custom?name=example.com"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/dns-json");

    let (status, _, _) = send(app(StaticClient::new(MOCK_ANSWER), Some("/custom")), get("/custom")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_http_listener_serves_both_client_drivers() {
    let forward = Arc::new(ForwardQueryUseCase::new(Arc::new(StaticClient::new(MOCK_ANSWER)), TIMEOUT));
    let bound = DohServer::new("http://127.0.0.1:0/dns-query", None, forward)
        .unwrap()
        .bind()
        .await
        .unwrap();
    let base = format!("http://{}", bound.local_addr());
    tokio::spawn(bound.serve());

    let query = build_query("example.com", RecordType::A).unwrap();
    let ctx = ExchangeContext::new(TIMEOUT);

    let rfc8484 = Rfc8484Client::new(&format!("{}/dns-query", base), false, TIMEOUT).unwrap();
    let answer = rfc8484.exchange(&ctx, &query).await.unwrap();
    assert_eq!(first_a(&answer), Some(MOCK_ANSWER));

    let google = GoogleClient::new(&format!("{}/resolve", base), false, TIMEOUT).unwrap();
    let answer = google.exchange(&ctx, &query).await.unwrap();
    assert_eq!(answer.id(), query.id());
    assert_eq!(first_a(&answer), Some(MOCK_ANSWER));
}
