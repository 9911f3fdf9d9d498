use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

/// Generate an alphanumeric `state` value for CSRF protection of redirect
/// flows. The library never mints state on its own; callers pass one through
/// the configuration and the matching callback is checked against it.
pub fn random_state(len: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// HTTP basic authentication header value for a client id/secret pair.
pub(crate) fn basic_auth(client_id: &str, client_secret: &str) -> String {
    let credentials = STANDARD.encode(format!("{client_id}:{client_secret}"));
    format!("Basic {credentials}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_state_is_alphanumeric() {
        let state = random_state(32);
        assert_eq!(state.len(), 32);
        assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn basic_auth_encodes_credentials() {
        assert_eq!(basic_auth("user", "pass"), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn basic_auth_tolerates_missing_credentials() {
        assert_eq!(basic_auth("", ""), "Basic Og==");
    }
}
