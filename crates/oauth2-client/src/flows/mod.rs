mod authorization_code;
mod callback;
mod credentials;
mod implicit;
mod jwt_bearer;
mod owner;

pub use authorization_code::AuthorizationCodeFlow;
pub use credentials::CredentialsFlow;
pub use implicit::ImplicitFlow;
pub use jwt_bearer::JwtBearerFlow;
pub use owner::OwnerFlow;

use url::Url;

use crate::config::{merge_pairs, ClientConfig};
use crate::error::AuthError;

/// Build the user-facing authorization URL for a redirect flow.
///
/// Standard parameters keep a fixed order (`client_id`, `redirect_uri`,
/// `scope`, `response_type`, `state`), with unset optional values serialized
/// as empty strings. Configured extra query pairs merge in afterwards and
/// may override any of them. An existing query on the authorization endpoint
/// survives.
pub(crate) fn build_authorization_url(
    config: &ClientConfig,
    response_type: &str,
) -> Result<Url, AuthError> {
    let client_id = config.expect_client_id()?;
    let mut url = config.expect_authorization_uri()?.clone();
    if url.cannot_be_a_base() {
        return Err(AuthError::QueryUnsupported(url));
    }

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    pairs.push(("client_id".to_owned(), client_id.to_owned()));
    pairs.push((
        "redirect_uri".to_owned(),
        config
            .redirect_uri
            .as_ref()
            .map(|uri| uri.to_string())
            .unwrap_or_default(),
    ));
    pairs.push(("scope".to_owned(), config.scope_string()));
    pairs.push(("response_type".to_owned(), response_type.to_owned()));
    pairs.push(("state".to_owned(), config.state.clone().unwrap_or_default()));
    let pairs = merge_pairs(pairs, &config.query);

    url.query_pairs_mut().clear().extend_pairs(&pairs);
    Ok(url)
}
