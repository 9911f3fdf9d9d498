use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use url::Url;

use crate::error::AuthError;

const USER_AGENT: &str = "oauth2-client/0.1.0";

/// A fully prepared outgoing request: the body is already form-encoded and
/// the header set is complete.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            url,
            method,
            headers: HeaderMap::new(),
            body: String::new(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Performs a single HTTP exchange on behalf of the client.
///
/// Implementations must resolve normally for 4xx/5xx statuses; only
/// transport-level problems (connect, TLS, I/O) are errors. Classification
/// of protocol failures happens in the client, not here.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, AuthError>;
}

/// Default transport backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, AuthError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http })
    }

    /// Wrap an existing reqwest client to reuse its pool, proxy, or TLS
    /// settings.
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, AuthError> {
        log::debug!("{} {}", request.method, request.url);
        let response = self
            .http
            .request(request.method, request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        log::debug!("response status {status}");
        Ok(HttpResponse { status, body })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use reqwest::header::{HeaderValue, CONTENT_TYPE};

    #[tokio::test]
    async fn error_statuses_resolve_normally() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(503).body("overloaded");
        });

        let transport = ReqwestTransport::new().unwrap();
        let url = Url::parse(&format!("{}{}", server.base_url(), "/token")).unwrap();
        let response = transport.execute(HttpRequest::post(url)).await.unwrap();
        mock.assert();
        assert_eq!(response.status.as_u16(), 503);
        assert_eq!(response.body, "overloaded");
    }

    #[tokio::test]
    async fn forwards_method_headers_and_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/token")
                .header("content-type", "application/x-www-form-urlencoded")
                .body("grant_type=password&username=niko");
            then.status(200).body("ok");
        });

        let url = Url::parse(&format!("{}{}", server.base_url(), "/token")).unwrap();
        let mut request = HttpRequest::post(url);
        request.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        request.body = "grant_type=password&username=niko".to_owned();

        let transport = ReqwestTransport::new().unwrap();
        let response = transport.execute(request).await.unwrap();
        mock.assert();
        assert_eq!(response.body, "ok");
    }

    #[tokio::test]
    async fn wrapped_clients_keep_their_settings() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/ping")
                .header("user-agent", "wrapped-agent/1.0");
            then.status(200).body("pong");
        });

        let http = reqwest::Client::builder()
            .user_agent("wrapped-agent/1.0")
            .build()
            .unwrap();
        let transport = ReqwestTransport::from_client(http);
        let url = Url::parse(&format!("{}{}", server.base_url(), "/ping")).unwrap();
        let response = transport.execute(HttpRequest::get(url)).await.unwrap();
        mock.assert();
        assert_eq!(response.body, "pong");
    }
}
