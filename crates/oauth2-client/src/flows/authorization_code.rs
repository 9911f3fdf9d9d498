use std::sync::Arc;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use serde_json::Value;
use url::Url;

use super::callback;
use crate::client::{OAuth2Client, TokenRequest};
use crate::config::{ClientConfig, RequestOptions};
use crate::error::{self, AuthError};
use crate::token::Token;
use crate::transport::HttpTransport;
use crate::util;

/// Authorization-code grant (RFC 6749 §4.1): the user authorizes in a
/// browser, the provider redirects back with a single-use code, and the code
/// is exchanged server-side for a token.
#[derive(Debug, Clone)]
pub struct AuthorizationCodeFlow {
    client: OAuth2Client,
}

impl AuthorizationCodeFlow {
    pub fn new(config: ClientConfig) -> Result<Self, AuthError> {
        Ok(Self {
            client: OAuth2Client::new(config)?,
        })
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            client: OAuth2Client::with_transport(config, transport),
        }
    }

    /// URL to send the user to for authorization.
    pub fn authorization_url(&self) -> Result<Url, AuthError> {
        self.authorization_url_with_options(&RequestOptions::new())
    }

    pub fn authorization_url_with_options(
        &self,
        options: &RequestOptions,
    ) -> Result<Url, AuthError> {
        let config = self.client.config().merged(options);
        super::build_authorization_url(&config, "code")
    }

    /// Exchange the callback URI the provider redirected to for a token.
    ///
    /// The callback is validated before any network call: redirect path,
    /// provider error parameters, state echo, and code presence, in that
    /// order.
    pub async fn get_token(&self, callback_uri: &str) -> Result<Token, AuthError> {
        self.get_token_with_options(callback_uri, &RequestOptions::new())
            .await
    }

    pub async fn get_token_with_options(
        &self,
        callback_uri: &str,
        options: &RequestOptions,
    ) -> Result<Token, AuthError> {
        let config = self.client.config().merged(options);
        let client_id = config.expect_client_id()?.to_owned();
        let uri = config.expect_access_token_uri()?.clone();

        let url = callback::parse_callback_uri(callback_uri)?;
        if let Some(redirect_uri) = &config.redirect_uri {
            callback::expect_redirect_path(&url, redirect_uri)?;
        }

        let params = callback::query_params(&url);
        if params.is_empty() {
            return Err(AuthError::InvalidCallback(callback_uri.to_owned()));
        }
        if let Some(err) = error::authorization_error(&params) {
            return Err(err);
        }
        callback::expect_state(config.state.as_deref(), &params)?;

        let code = params
            .get("code")
            .and_then(Value::as_str)
            .filter(|code| !code.is_empty())
            .ok_or(AuthError::MissingCode)?;

        let mut request = TokenRequest::post(uri);
        request.body = vec![
            ("code".to_owned(), code.to_owned()),
            ("grant_type".to_owned(), "authorization_code".to_owned()),
            (
                "redirect_uri".to_owned(),
                config
                    .redirect_uri
                    .as_ref()
                    .map(|uri| uri.to_string())
                    .unwrap_or_default(),
            ),
        ];

        match config
            .client_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
        {
            Some(secret) => {
                let header = util::basic_auth(&client_id, secret);
                request
                    .headers
                    .insert(AUTHORIZATION, HeaderValue::from_str(&header)?);
            }
            None => request.body.push(("client_id".to_owned(), client_id)),
        }

        let data = self.client.execute(request, &config).await?;
        self.client.create_token(data)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::transport::testing::RecordingTransport;
    use crate::util::random_state;

    fn base_config(token_url: &str) -> ClientConfig {
        ClientConfig::new()
            .with_client_id("abc")
            .with_client_secret("123")
            .with_access_token_uri(Url::parse(token_url).unwrap())
            .with_authorization_uri(
                Url::parse("https://github.com/login/oauth/authorize").unwrap(),
            )
            .with_redirect_uri(Url::parse("http://example.com/auth/callback").unwrap())
            .with_scopes(["notifications"])
    }

    fn token_response() -> serde_json::Value {
        json!({
            "access_token": "access789",
            "refresh_token": "refresh101",
            "token_type": "bearer",
            "expires_in": 3600
        })
    }

    #[test]
    fn authorization_url_matches_the_documented_shape() {
        let flow = AuthorizationCodeFlow::new(base_config(
            "https://github.com/login/oauth/access_token",
        ))
        .unwrap();
        let url = flow.authorization_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://github.com/login/oauth/authorize\
             ?client_id=abc\
             &redirect_uri=http%3A%2F%2Fexample.com%2Fauth%2Fcallback\
             &scope=notifications\
             &response_type=code\
             &state="
        );
    }

    #[tokio::test]
    async fn exchanges_the_callback_code_for_a_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/login/oauth/access_token")
                .header("authorization", "Basic YWJjOjEyMw==")
                .header("content-type", "application/x-www-form-urlencoded")
                .body_contains("code=xyz")
                .body_contains("grant_type=authorization_code")
                .body_contains("redirect_uri=http%3A%2F%2Fexample.com%2Fauth%2Fcallback");
            then.status(200).json_body_obj(&token_response());
        });

        let flow = AuthorizationCodeFlow::new(base_config(&format!(
            "{}{}",
            server.base_url(),
            "/login/oauth/access_token"
        )))
        .unwrap();
        let token = flow
            .get_token("http://example.com/auth/callback?code=xyz")
            .await
            .unwrap();
        mock.assert();
        assert_eq!(token.access_token, "access789");
        assert_eq!(token.refresh_token, "refresh101");
        assert!(!token.expired());
    }

    #[tokio::test]
    async fn client_id_moves_to_the_body_without_a_secret() {
        let transport = Arc::new(RecordingTransport::new(200, &token_response().to_string()));
        let config = base_config("https://provider.example.com/oauth/token");
        let flow = AuthorizationCodeFlow::with_transport(
            ClientConfig {
                client_secret: None,
                ..config
            },
            transport.clone(),
        );

        flow.get_token("http://example.com/auth/callback?code=xyz")
            .await
            .unwrap();

        let sent = transport.last_request().unwrap();
        assert!(sent.headers.get(AUTHORIZATION).is_none());
        assert!(sent.body.contains("client_id=abc"));
    }

    #[tokio::test]
    async fn matching_state_is_accepted() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/login/oauth/access_token");
            then.status(200).json_body_obj(&token_response());
        });

        let state = random_state(16);
        let config = base_config(&format!(
            "{}{}",
            server.base_url(),
            "/login/oauth/access_token"
        ))
        .with_state(state.clone());
        let flow = AuthorizationCodeFlow::new(config).unwrap();
        let token = flow
            .get_token(&format!(
                "http://example.com/auth/callback?code=xyz&state={state}"
            ))
            .await
            .unwrap();
        assert_eq!(token.access_token, "access789");
    }

    #[tokio::test]
    async fn state_mismatch_is_rejected_before_any_request() {
        let transport = Arc::new(RecordingTransport::new(200, &token_response().to_string()));
        let config =
            base_config("https://provider.example.com/oauth/token").with_state("expected");
        let flow = AuthorizationCodeFlow::with_transport(config, transport.clone());

        let err = flow
            .get_token("http://example.com/auth/callback?code=xyz&state=other")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::StateMismatch(received) if received == "other"));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn provider_errors_short_circuit() {
        let transport = Arc::new(RecordingTransport::new(200, &token_response().to_string()));
        let config = base_config("https://provider.example.com/oauth/token");
        let flow = AuthorizationCodeFlow::with_transport(config, transport.clone());

        let err = flow
            .get_token("http://example.com/auth/callback?error=access_denied")
            .await
            .unwrap_err();
        match err {
            AuthError::Auth { message, .. } => {
                assert_eq!(
                    message,
                    "The resource owner or authorization server denied the request."
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn redirect_path_must_match() {
        let flow = AuthorizationCodeFlow::new(base_config(
            "https://provider.example.com/oauth/token",
        ))
        .unwrap();
        let err = flow
            .get_token("http://example.com/wrong?code=xyz")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::RedirectMismatch(path) if path == "/wrong"));
    }

    #[tokio::test]
    async fn callbacks_without_parameters_are_rejected() {
        let flow = AuthorizationCodeFlow::new(base_config(
            "https://provider.example.com/oauth/token",
        ))
        .unwrap();
        let err = flow
            .get_token("http://example.com/auth/callback")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCallback(_)));
    }

    #[tokio::test]
    async fn callbacks_without_a_code_are_rejected() {
        let flow = AuthorizationCodeFlow::new(base_config(
            "https://provider.example.com/oauth/token",
        ))
        .unwrap();
        let err = flow
            .get_token("http://example.com/auth/callback?state=")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingCode));
    }

    #[tokio::test]
    async fn bare_path_callbacks_are_accepted() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/login/oauth/access_token");
            then.status(200).json_body_obj(&token_response());
        });

        let flow = AuthorizationCodeFlow::new(base_config(&format!(
            "{}{}",
            server.base_url(),
            "/login/oauth/access_token"
        )))
        .unwrap();
        let token = flow.get_token("/auth/callback?code=xyz").await.unwrap();
        mock.assert();
        assert_eq!(token.access_token, "access789");
    }
}
