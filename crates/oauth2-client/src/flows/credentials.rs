use std::sync::Arc;

use reqwest::header::{HeaderValue, AUTHORIZATION};

use crate::client::{OAuth2Client, TokenRequest};
use crate::config::{ClientConfig, RequestOptions};
use crate::error::AuthError;
use crate::token::Token;
use crate::transport::HttpTransport;
use crate::util;

/// Client-credentials grant (RFC 6749 §4.4): machine-to-machine tokens tied
/// to the client itself rather than a user.
#[derive(Debug, Clone)]
pub struct CredentialsFlow {
    client: OAuth2Client,
}

impl CredentialsFlow {
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

    pub async fn get_token(&self) -> Result<Token, AuthError> {
        self.get_token_with_options(&RequestOptions::new()).await
    }

    pub async fn get_token_with_options(
        &self,
        options: &RequestOptions,
    ) -> Result<Token, AuthError> {
        let config = self.client.config().merged(options);
        let client_id = config.expect_client_id()?.to_owned();
        let client_secret = config.expect_client_secret()?.to_owned();
        let uri = config.expect_access_token_uri()?.clone();

        let mut request = TokenRequest::post(uri);
        request.body = vec![
            ("scope".to_owned(), config.scope_string()),
            ("grant_type".to_owned(), "client_credentials".to_owned()),
        ];
        let header = util::basic_auth(&client_id, &client_secret);
        request
            .headers
            .insert(AUTHORIZATION, HeaderValue::from_str(&header)?);

        let data = self.client.execute(request, &config).await?;
        self.client.create_token(data)
    }
}
