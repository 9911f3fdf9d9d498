use std::sync::Arc;

use reqwest::header::{HeaderValue, AUTHORIZATION};

use crate::client::{OAuth2Client, TokenRequest};
use crate::config::{ClientConfig, RequestOptions};
use crate::error::AuthError;
use crate::token::Token;
use crate::transport::HttpTransport;
use crate::util;

/// JWT bearer grant (RFC 7523): a signed assertion minted elsewhere is
/// exchanged for an access token. Producing the assertion is the caller's
/// business.
#[derive(Debug, Clone)]
pub struct JwtBearerFlow {
    client: OAuth2Client,
}

impl JwtBearerFlow {
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

    pub async fn get_token(&self, assertion: &str) -> Result<Token, AuthError> {
        self.get_token_with_options(assertion, &RequestOptions::new())
            .await
    }

    pub async fn get_token_with_options(
        &self,
        assertion: &str,
        options: &RequestOptions,
    ) -> Result<Token, AuthError> {
        let config = self.client.config().merged(options);
        let uri = config.expect_access_token_uri()?.clone();

        let mut request = TokenRequest::post(uri);
        request.body = vec![
            ("scope".to_owned(), config.scope_string()),
            (
                "grant_type".to_owned(),
                "urn:ietf:params:oauth:grant-type:jwt-bearer".to_owned(),
            ),
            ("assertion".to_owned(), assertion.to_owned()),
        ];

        // Client authentication is optional for this grant (RFC 6749 §3.2.1).
        if let Some(client_id) = config.client_id.as_deref().filter(|id| !id.is_empty()) {
            let header = util::basic_auth(
                client_id,
                config.client_secret.as_deref().unwrap_or_default(),
            );
            request
                .headers
                .insert(AUTHORIZATION, HeaderValue::from_str(&header)?);
        }

        let data = self.client.execute(request, &config).await?;
        self.client.create_token(data)
    }
}
