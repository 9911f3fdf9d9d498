use std::sync::Arc;

use url::Url;

use super::callback;
use crate::client::OAuth2Client;
use crate::config::{ClientConfig, RequestOptions};
use crate::error::{self, AuthError};
use crate::token::Token;
use crate::transport::HttpTransport;

/// Implicit grant (RFC 6749 §4.2): the provider returns the token directly in
/// the redirect, so no exchange request is made and [`get_token`] is
/// synchronous.
///
/// [`get_token`]: ImplicitFlow::get_token
#[derive(Debug, Clone)]
pub struct ImplicitFlow {
    client: OAuth2Client,
}

impl ImplicitFlow {
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
        super::build_authorization_url(&config, "token")
    }

    /// Extract the token carried by the callback URI the provider redirected
    /// to. Parameters are read from the query and the fragment.
    pub fn get_token(&self, callback_uri: &str) -> Result<Token, AuthError> {
        self.get_token_with_options(callback_uri, &RequestOptions::new())
    }

    pub fn get_token_with_options(
        &self,
        callback_uri: &str,
        options: &RequestOptions,
    ) -> Result<Token, AuthError> {
        let config = self.client.config().merged(options);
        let redirect_uri = config.expect_redirect_uri()?;

        let url = callback::parse_callback_uri(callback_uri)?;
        callback::expect_redirect_path(&url, redirect_uri)?;

        // Fragment values win when a key appears in both places.
        let mut params = callback::query_params(&url);
        for (key, value) in callback::fragment_params(&url) {
            params.insert(key, value);
        }
        if params.is_empty() {
            return Err(AuthError::InvalidCallback(callback_uri.to_owned()));
        }
        if let Some(err) = error::authorization_error(&params) {
            return Err(err);
        }
        callback::expect_state(config.state.as_deref(), &params)?;

        self.client.create_token(params)
    }
}
