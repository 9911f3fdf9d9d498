use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::error::AuthError;

/// Static client configuration shared by every grant flow.
///
/// Every field is optional at the type level; each flow checks the fields it
/// needs before composing a request, so a missing value fails fast with the
/// field's name instead of producing a malformed request.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token_uri: Option<Url>,
    pub authorization_uri: Option<Url>,
    pub redirect_uri: Option<Url>,
    pub scopes: Vec<String>,
    pub state: Option<String>,
    /// Extra query pairs merged into every composed request.
    pub query: Vec<(String, String)>,
    /// Extra body pairs merged into every composed request.
    pub body: Vec<(String, String)>,
    /// Extra headers applied on top of the defaults.
    pub headers: HeaderMap,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client_id<S: Into<String>>(mut self, client_id: S) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_client_secret<S: Into<String>>(mut self, client_secret: S) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn with_access_token_uri(mut self, uri: Url) -> Self {
        self.access_token_uri = Some(uri);
        self
    }

    pub fn with_authorization_uri(mut self, uri: Url) -> Self {
        self.authorization_uri = Some(uri);
        self
    }

    pub fn with_redirect_uri(mut self, uri: Url) -> Self {
        self.redirect_uri = Some(uri);
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_state<S: Into<String>>(mut self, state: S) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_query_param<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body_param<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Effective configuration for one call: scalar overrides replace the
    /// configured value, extra query/body/header entries merge per key with
    /// the override winning.
    pub(crate) fn merged(&self, options: &RequestOptions) -> ClientConfig {
        let mut config = self.clone();
        if let Some(client_id) = &options.client_id {
            config.client_id = Some(client_id.clone());
        }
        if let Some(client_secret) = &options.client_secret {
            config.client_secret = Some(client_secret.clone());
        }
        if let Some(uri) = &options.access_token_uri {
            config.access_token_uri = Some(uri.clone());
        }
        if let Some(uri) = &options.authorization_uri {
            config.authorization_uri = Some(uri.clone());
        }
        if let Some(uri) = &options.redirect_uri {
            config.redirect_uri = Some(uri.clone());
        }
        if let Some(scopes) = &options.scopes {
            config.scopes = scopes.clone();
        }
        if let Some(state) = &options.state {
            config.state = Some(state.clone());
        }
        config.query = merge_pairs(config.query, &options.query);
        config.body = merge_pairs(config.body, &options.body);
        for (name, value) in &options.headers {
            config.headers.insert(name.clone(), value.clone());
        }
        config
    }

    pub(crate) fn expect_client_id(&self) -> Result<&str, AuthError> {
        self.client_id
            .as_deref()
            .ok_or(AuthError::MissingConfig("client_id"))
    }

    pub(crate) fn expect_client_secret(&self) -> Result<&str, AuthError> {
        self.client_secret
            .as_deref()
            .ok_or(AuthError::MissingConfig("client_secret"))
    }

    pub(crate) fn expect_access_token_uri(&self) -> Result<&Url, AuthError> {
        self.access_token_uri
            .as_ref()
            .ok_or(AuthError::MissingConfig("access_token_uri"))
    }

    pub(crate) fn expect_authorization_uri(&self) -> Result<&Url, AuthError> {
        self.authorization_uri
            .as_ref()
            .ok_or(AuthError::MissingConfig("authorization_uri"))
    }

    pub(crate) fn expect_redirect_uri(&self) -> Result<&Url, AuthError> {
        self.redirect_uri
            .as_ref()
            .ok_or(AuthError::MissingConfig("redirect_uri"))
    }

    /// Space-joined scope string; no scopes serialize as the empty string,
    /// never as a literal `null` or similar.
    pub(crate) fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Per-call overrides applied on top of a flow's [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token_uri: Option<Url>,
    pub authorization_uri: Option<Url>,
    pub redirect_uri: Option<Url>,
    pub scopes: Option<Vec<String>>,
    pub state: Option<String>,
    pub query: Vec<(String, String)>,
    pub body: Vec<(String, String)>,
    pub headers: HeaderMap,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client_id<S: Into<String>>(mut self, client_id: S) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_client_secret<S: Into<String>>(mut self, client_secret: S) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn with_access_token_uri(mut self, uri: Url) -> Self {
        self.access_token_uri = Some(uri);
        self
    }

    pub fn with_authorization_uri(mut self, uri: Url) -> Self {
        self.authorization_uri = Some(uri);
        self
    }

    pub fn with_redirect_uri(mut self, uri: Url) -> Self {
        self.redirect_uri = Some(uri);
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_state<S: Into<String>>(mut self, state: S) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_query_param<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body_param<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Merge override pairs into base pairs. An override replaces every earlier
/// entry with the same key and lands at the end, so serialization order stays
/// deterministic.
pub(crate) fn merge_pairs(
    base: Vec<(String, String)>,
    overrides: &[(String, String)],
) -> Vec<(String, String)> {
    let mut merged = base;
    for (key, value) in overrides {
        merged.retain(|(existing, _)| existing != key);
        merged.push((key.clone(), value.clone()));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::CONTENT_TYPE;

    #[test]
    fn scopes_join_with_spaces() {
        let config = ClientConfig::new().with_scopes(["read", "write"]);
        assert_eq!(config.scope_string(), "read write");
    }

    #[test]
    fn no_scopes_serialize_as_empty_string() {
        assert_eq!(ClientConfig::new().scope_string(), "");
    }

    #[test]
    fn missing_fields_fail_by_name() {
        let config = ClientConfig::new();
        assert!(matches!(
            config.expect_client_id(),
            Err(AuthError::MissingConfig("client_id"))
        ));
        assert!(matches!(
            config.expect_access_token_uri(),
            Err(AuthError::MissingConfig("access_token_uri"))
        ));
    }

    #[test]
    fn merged_replaces_scalars_and_keeps_the_rest() {
        let config = ClientConfig::new()
            .with_client_id("abc")
            .with_state("base-state");
        let options = RequestOptions::new().with_state("call-state");
        let merged = config.merged(&options);
        assert_eq!(merged.client_id.as_deref(), Some("abc"));
        assert_eq!(merged.state.as_deref(), Some("call-state"));
    }

    #[test]
    fn merged_body_overrides_win_per_key() {
        let config = ClientConfig::new()
            .with_body_param("scope", "a")
            .with_body_param("audience", "api");
        let options = RequestOptions::new().with_body_param("scope", "b");
        let merged = config.merged(&options);
        assert_eq!(
            merged.body,
            vec![
                ("audience".to_owned(), "api".to_owned()),
                ("scope".to_owned(), "b".to_owned()),
            ]
        );
    }

    #[test]
    fn merged_headers_replace_by_name() {
        let config = ClientConfig::new().with_header(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let options = RequestOptions::new()
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let merged = config.merged(&options);
        assert_eq!(
            merged.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
    }

    #[test]
    fn merge_pairs_is_order_preserving() {
        let base = vec![
            ("grant_type".to_owned(), "password".to_owned()),
            ("scope".to_owned(), "read".to_owned()),
        ];
        let merged = merge_pairs(base, &[("scope".to_owned(), "write".to_owned())]);
        assert_eq!(
            merged,
            vec![
                ("grant_type".to_owned(), "password".to_owned()),
                ("scope".to_owned(), "write".to_owned()),
            ]
        );
    }
}
