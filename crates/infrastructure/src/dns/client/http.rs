use dohgate_domain::DomainError;
use std::time::Duration;

const USER_AGENT: &str = concat!("dohgate/", env!("CARGO_PKG_VERSION"));

/// Pooled HTTP client shared by every exchange of one driver instance.
pub fn build_http_client(insecure: bool, timeout: Duration) -> Result<reqwest::Client, DomainError> {
    reqwest::Client::builder()
        .use_rustls_tls()
        .danger_accept_invalid_certs(insecure)
        .timeout(timeout)
        .pool_max_idle_per_host(4)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| DomainError::ConfigError(format!("Failed to build HTTP client: {}", e)))
}

pub fn map_reqwest_error(url: &str, err: reqwest::Error) -> DomainError {
    if err.is_timeout() {
        DomainError::TransportTimeout {
            server: url.to_string(),
        }
    } else if err.is_connect() {
        DomainError::TransportConnectionRefused {
            server: url.to_string(),
        }
    } else {
        DomainError::Transport(format!("HTTP request to {} failed: {}", url, err))
    }
}

/// Sends `request` and returns the body of a 2xx response.
pub async fn fetch_body(url: &str, request: reqwest::RequestBuilder) -> Result<bytes::Bytes, DomainError> {
    let response = request.send().await.map_err(|e| map_reqwest_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DomainError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.bytes().await.map_err(|e| map_reqwest_error(url, e))
}
