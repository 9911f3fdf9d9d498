use reqwest::header::InvalidHeaderValue;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

/// Errors surfaced by grant flows, token operations, and request execution.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("expected `{0}` to be configured")]
    MissingConfig(&'static str),
    #[error("authorization error: {message}")]
    Auth {
        message: String,
        body: Map<String, Value>,
    },
    #[error("unexpected response status {status}")]
    Status { status: StatusCode, body: String },
    #[error("redirected path '{0}' does not match the configured redirect path")]
    RedirectMismatch(String),
    #[error("state mismatch: received '{0}'")]
    StateMismatch(String),
    #[error("authorization response missing code parameter")]
    MissingCode,
    #[error("unable to extract parameters from callback uri '{0}'")]
    InvalidCallback(String),
    #[error("token refresh unavailable")]
    RefreshUnavailable,
    #[error("cannot sign a request without an access token")]
    MissingAccessToken,
    #[error("unusable expires_in value: {0}")]
    InvalidExpiry(String),
    #[error("url '{0}' cannot carry query parameters")]
    QueryUnsupported(Url),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid header value: {0}")]
    Header(#[from] InvalidHeaderValue),
}

/// Canonical descriptions for the error codes defined by RFC 6749 §4.1.2.1.
fn error_description(code: &str) -> Option<&'static str> {
    let message = match code {
        "invalid_request" => {
            "The request is missing a required parameter, includes an \
             invalid parameter value, includes a parameter more than \
             once, or is otherwise malformed."
        }
        "invalid_client" => {
            "Client authentication failed (e.g., unknown client, no \
             client authentication included, or unsupported \
             authentication method)."
        }
        "invalid_grant" => {
            "The provided authorization grant (e.g., authorization \
             code, resource owner credentials) or refresh token is \
             invalid, expired, revoked, does not match the redirection \
             URI used in the authorization request, or was issued to \
             another client."
        }
        "unauthorized_client" => {
            "The client is not authorized to request an authorization \
             code using this method."
        }
        "unsupported_grant_type" => {
            "The authorization grant type is not supported by the \
             authorization server."
        }
        "access_denied" => "The resource owner or authorization server denied the request.",
        "unsupported_response_type" => {
            "The authorization server does not support obtaining \
             an authorization code using this method."
        }
        "invalid_scope" => "The requested scope is invalid, unknown, or malformed.",
        "server_error" => {
            "The authorization server encountered an unexpected \
             condition that prevented it from fulfilling the request. \
             (This error code is needed because a 500 Internal Server \
             Error HTTP status code cannot be returned to the client \
             via an HTTP redirect.)"
        }
        "temporarily_unavailable" => {
            "The authorization server is currently unable to handle \
             the request due to a temporary overloading or maintenance \
             of the server."
        }
        _ => return None,
    };
    Some(message)
}

/// Pull the authentication error described by a response body, if any.
///
/// The message comes from the RFC 6749 table when the code is a known one,
/// then from `error_description`, then from the raw `error` value. Empty
/// strings never classify.
pub(crate) fn authorization_error(body: &Map<String, Value>) -> Option<AuthError> {
    let code = body
        .get("error")
        .and_then(Value::as_str)
        .filter(|code| !code.is_empty());
    let message = code
        .and_then(error_description)
        .or_else(|| {
            body.get("error_description")
                .and_then(Value::as_str)
                .filter(|description| !description.is_empty())
        })
        .or(code)?;

    Some(AuthError::Auth {
        message: message.to_owned(),
        body: body.clone(),
    })
}
