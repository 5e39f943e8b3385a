//! Service account authentication

mod credential;
mod token;

pub use credential::{Credential, CLOUD_PLATFORM_SCOPE, DEFAULT_TOKEN_URI};
pub use token::{exchange, AccessToken, TokenCache};
