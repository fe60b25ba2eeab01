//! Login lookup and run-scoped token lifecycle.
//!
//! - [`Netrc`] resolves the long-lived login for a host.
//! - [`TokenProvider`] issues and revokes the short-lived token a run uses.
//! - [`with_token`] ties the two ends together: the token is revoked on
//!   every exit path of the scoped body.

mod error;
mod netrc;
mod token;

pub use error::{AuthError, Result};
pub use netrc::{Credentials, Netrc};
pub use token::{CmrTokenProvider, Token, TokenProvider, with_token};
