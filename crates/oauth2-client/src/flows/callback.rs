use serde_json::{Map, Value};
use url::{form_urlencoded, Url};

use crate::error::AuthError;

/// Parse a callback URI, accepting both absolute URLs and bare paths such as
/// `/auth/callback?code=...`.
pub(crate) fn parse_callback_uri(raw: &str) -> Result<Url, AuthError> {
    match Url::parse(raw) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse("http://localhost").unwrap();
            Ok(base.join(raw)?)
        }
        Err(err) => Err(err.into()),
    }
}

/// The callback must land on the same path the redirect URI was configured
/// with; everything else about the two URLs may differ.
pub(crate) fn expect_redirect_path(url: &Url, expected: &Url) -> Result<(), AuthError> {
    if url.path() != expected.path() {
        return Err(AuthError::RedirectMismatch(url.path().to_owned()));
    }
    Ok(())
}

pub(crate) fn query_params(url: &Url) -> Map<String, Value> {
    url.query_pairs()
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect()
}

pub(crate) fn fragment_params(url: &Url) -> Map<String, Value> {
    match url.fragment() {
        Some(fragment) => form_urlencoded::parse(fragment.as_bytes())
            .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
            .collect(),
        None => Map::new(),
    }
}

/// When a state was configured, the callback must echo it back exactly.
pub(crate) fn expect_state(
    expected: Option<&str>,
    params: &Map<String, Value>,
) -> Result<(), AuthError> {
    if let Some(expected) = expected {
        let received = params
            .get("state")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if received != expected {
            return Err(AuthError::StateMismatch(received.to_owned()));
        }
    }
    Ok(())
}
