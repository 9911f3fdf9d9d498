//! Client-side OAuth 2.0 (RFC 6749) grant flows and token handling.
//!
//! Each grant flow composes a token request from a [`ClientConfig`], executes
//! it through an injected [`HttpTransport`], and wraps the response into a
//! [`Token`] that can sign outgoing requests and refresh itself.

pub mod client;
pub mod config;
pub mod error;
pub mod flows;
pub mod token;
pub mod transport;
pub mod util;

pub use client::{OAuth2Client, TokenRequest};
pub use config::{ClientConfig, RequestOptions};
pub use error::AuthError;
pub use flows::{AuthorizationCodeFlow, CredentialsFlow, ImplicitFlow, JwtBearerFlow, OwnerFlow};
pub use token::Token;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use util::random_state;
