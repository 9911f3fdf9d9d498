use std::fmt;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde_json::{Map, Value};
use url::{form_urlencoded, Url};

use crate::config::{merge_pairs, ClientConfig};
use crate::error::{self, AuthError};
use crate::token::Token;
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};

/// Request description composed by a grant flow: key/value body and query
/// pairs, not yet encoded for the wire.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl TokenRequest {
    pub fn post(url: Url) -> Self {
        Self {
            url,
            method: Method::POST,
            headers: HeaderMap::new(),
            body: Vec::new(),
            query: Vec::new(),
        }
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, application/x-www-form-urlencoded"),
    );
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    headers
}

/// Executes token-endpoint requests and derives [`Token`]s from their
/// responses. Cloning is cheap; clones share the same transport.
#[derive(Clone)]
pub struct OAuth2Client {
    config: ClientConfig,
    transport: Arc<dyn HttpTransport>,
}

impl fmt::Debug for OAuth2Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OAuth2Client {
    pub fn new(config: ClientConfig) -> Result<Self, AuthError> {
        Ok(Self::with_transport(config, Arc::new(ReqwestTransport::new()?)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build a [`Token`] from raw grant data: a token-endpoint response body
    /// or previously stored fields.
    pub fn create_token(&self, data: Map<String, Value>) -> Result<Token, AuthError> {
        Token::from_data(self.clone(), data)
    }

    /// Execute a composed request and return the parsed response body.
    ///
    /// A classified authorization error rejects before the status check; a
    /// status outside `200..399` rejects carrying the literal status and raw
    /// body. One transport call, no retries.
    pub(crate) async fn execute(
        &self,
        request: TokenRequest,
        config: &ClientConfig,
    ) -> Result<Map<String, Value>, AuthError> {
        let TokenRequest {
            mut url,
            method,
            headers,
            body,
            query,
        } = request;

        let mut merged_headers = default_headers();
        for (name, value) in &headers {
            merged_headers.insert(name.clone(), value.clone());
        }
        for (name, value) in &config.headers {
            merged_headers.insert(name.clone(), value.clone());
        }

        let body_pairs = merge_pairs(body, &config.body);
        let encoded_body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&body_pairs)
            .finish();

        let query_pairs = merge_pairs(query, &config.query);
        if !query_pairs.is_empty() {
            if url.cannot_be_a_base() {
                return Err(AuthError::QueryUnsupported(url));
            }
            url.query_pairs_mut().extend_pairs(&query_pairs);
        }

        let response = self
            .transport
            .execute(HttpRequest {
                url,
                method,
                headers: merged_headers,
                body: encoded_body,
            })
            .await?;

        let parsed = parse_response_body(&response.body);
        if let Some(err) = error::authorization_error(&parsed) {
            log::debug!("token endpoint returned an authorization error");
            return Err(err);
        }

        // 399 itself is already out of range, as are informational 1xx
        // responses.
        if !(200..399).contains(&response.status.as_u16()) {
            return Err(AuthError::Status {
                status: response.status,
                body: response.body,
            });
        }

        Ok(parsed)
    }
}

/// Parse a response body as a JSON object, falling back to form-urlencoded
/// pairs. The result is always a map.
pub(crate) fn parse_response_body(body: &str) -> Map<String, Value> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        return map;
    }
    form_urlencoded::parse(body.as_bytes())
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect()
}
