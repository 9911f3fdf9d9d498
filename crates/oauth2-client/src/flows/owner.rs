use std::sync::Arc;

use reqwest::header::{HeaderValue, AUTHORIZATION};

use crate::client::{OAuth2Client, TokenRequest};
use crate::config::{ClientConfig, RequestOptions};
use crate::error::AuthError;
use crate::token::Token;
use crate::transport::HttpTransport;
use crate::util;

/// Resource-owner password grant (RFC 6749 §4.3): the user's credentials are
/// posted directly to the token endpoint.
#[derive(Debug, Clone)]
pub struct OwnerFlow {
    client: OAuth2Client,
}

impl OwnerFlow {
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

    pub async fn get_token(&self, username: &str, password: &str) -> Result<Token, AuthError> {
        self.get_token_with_options(username, password, &RequestOptions::new())
            .await
    }

    pub async fn get_token_with_options(
        &self,
        username: &str,
        password: &str,
        options: &RequestOptions,
    ) -> Result<Token, AuthError> {
        let config = self.client.config().merged(options);
        let uri = config.expect_access_token_uri()?.clone();

        let mut request = TokenRequest::post(uri);
        request.body = vec![
            ("scope".to_owned(), config.scope_string()),
            ("username".to_owned(), username.to_owned()),
            ("password".to_owned(), password.to_owned()),
            ("grant_type".to_owned(), "password".to_owned()),
        ];
        let header = util::basic_auth(
            config.client_id.as_deref().unwrap_or_default(),
            config.client_secret.as_deref().unwrap_or_default(),
        );
        request
            .headers
            .insert(AUTHORIZATION, HeaderValue::from_str(&header)?);

        let data = self.client.execute(request, &config).await?;
        self.client.create_token(data)
    }
}
