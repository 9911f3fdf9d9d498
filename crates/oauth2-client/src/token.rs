use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderValue, AUTHORIZATION, CACHE_CONTROL, PRAGMA};
use serde_json::{Map, Value};

use crate::client::{OAuth2Client, TokenRequest};
use crate::config::RequestOptions;
use crate::error::AuthError;
use crate::transport::HttpRequest;
use crate::util;

/// An issued access token together with the raw grant data it came from.
///
/// Tokens are immutable once created; [`Token::refresh`] returns a brand-new
/// token and leaves the original untouched.
#[derive(Debug, Clone)]
pub struct Token {
    client: OAuth2Client,
    data: Map<String, Value>,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires: Option<DateTime<Utc>>,
}

impl Token {
    pub(crate) fn from_data(
        client: OAuth2Client,
        data: Map<String, Value>,
    ) -> Result<Self, AuthError> {
        let access_token = string_field(&data, "access_token");
        let refresh_token = string_field(&data, "refresh_token");
        let token_type = string_field(&data, "token_type").to_lowercase();
        let expires = match data.get("expires_in") {
            None | Some(Value::Null) => None,
            Some(value) => Some(expiry_from_now(value)?),
        };

        Ok(Self {
            client,
            data,
            access_token,
            refresh_token,
            token_type,
            expires,
        })
    }

    /// Override the expiry with an absolute instant, e.g. when rehydrating a
    /// stored token.
    pub fn expires_at(mut self, instant: DateTime<Utc>) -> Self {
        self.expires = Some(instant);
        self
    }

    /// Raw key/value data this token was built from. Fields the library does
    /// not model (granted scopes, provider extensions) ride along here.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Granted scopes, whitespace-split from the raw `scope` field.
    pub fn scope(&self) -> Vec<String> {
        self.data
            .get("scope")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .split_whitespace()
            .map(ToOwned::to_owned)
            .collect()
    }

    /// Whether the current time is past the token's expiry. Tokens without
    /// an expiry never expire.
    pub fn expired(&self) -> bool {
        match self.expires {
            Some(expires) => Utc::now() > expires,
            None => false,
        }
    }

    /// Enrich an outgoing request with this token's credentials.
    ///
    /// Bearer tokens sign through the `Authorization` header. Every other
    /// token type signs through an `access_token` query parameter (replacing
    /// any existing one, keeping the fragment) and marks the request
    /// uncacheable with `Pragma`/`Cache-Control: no-store`.
    pub fn sign(&self, mut request: HttpRequest) -> Result<HttpRequest, AuthError> {
        if self.access_token.is_empty() {
            return Err(AuthError::MissingAccessToken);
        }

        if self.token_type == "bearer" {
            let value = HeaderValue::from_str(&format!("Bearer {}", self.access_token))?;
            request.headers.insert(AUTHORIZATION, value);
        } else {
            if request.url.cannot_be_a_base() {
                return Err(AuthError::QueryUnsupported(request.url));
            }
            let pairs: Vec<(String, String)> = request
                .url
                .query_pairs()
                .filter(|(key, _)| key != "access_token")
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();
            {
                let mut serializer = request.url.query_pairs_mut();
                serializer.clear();
                serializer.extend_pairs(&pairs);
                serializer.append_pair("access_token", &self.access_token);
            }
            request
                .headers
                .insert(PRAGMA, HeaderValue::from_static("no-store"));
            request
                .headers
                .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        }

        Ok(request)
    }

    /// Exchange the stored refresh token for a fresh token.
    pub async fn refresh(&self) -> Result<Token, AuthError> {
        self.refresh_with_options(&RequestOptions::new()).await
    }

    /// Like [`Token::refresh`], with per-call configuration overrides.
    ///
    /// The new token's data is the old raw data merged with the response;
    /// response fields win, anything the server did not resend (commonly the
    /// refresh token itself) carries over.
    pub async fn refresh_with_options(&self, options: &RequestOptions) -> Result<Token, AuthError> {
        if self.refresh_token.is_empty() {
            return Err(AuthError::RefreshUnavailable);
        }

        let config = self.client.config().merged(options);
        let uri = config.expect_access_token_uri()?.clone();

        let mut request = TokenRequest::post(uri);
        let header = util::basic_auth(
            config.client_id.as_deref().unwrap_or_default(),
            config.client_secret.as_deref().unwrap_or_default(),
        );
        request
            .headers
            .insert(AUTHORIZATION, HeaderValue::from_str(&header)?);
        request.body = vec![
            ("refresh_token".to_owned(), self.refresh_token.clone()),
            ("grant_type".to_owned(), "refresh_token".to_owned()),
        ];

        let data = self.client.execute(request, &config).await?;
        let mut merged = self.data.clone();
        for (key, value) in data {
            merged.insert(key, value);
        }
        self.client.create_token(merged)
    }
}

fn string_field(data: &Map<String, Value>, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// `expires_in` arrives as a JSON number from token endpoints and as a string
/// from implicit-flow fragments; both mean seconds from now. Values that do
/// not land on a representable instant are unusable like any other bad shape.
fn expiry_from_now(value: &Value) -> Result<DateTime<Utc>, AuthError> {
    let seconds = expires_in_seconds(value)?;
    Duration::try_seconds(seconds)
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .ok_or_else(|| AuthError::InvalidExpiry(seconds.to_string()))
}

fn expires_in_seconds(value: &Value) -> Result<i64, AuthError> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|seconds| seconds as i64))
            .ok_or_else(|| AuthError::InvalidExpiry(number.to_string())),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| text.trim().parse::<f64>().ok().map(|seconds| seconds as i64))
            .ok_or_else(|| AuthError::InvalidExpiry(text.clone())),
        other => Err(AuthError::InvalidExpiry(other.to_string())),
    }
}
