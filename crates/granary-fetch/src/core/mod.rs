//! Pure transformations for transfers.
//!
//! Nothing in here performs I/O, so every rule the effects layer relies on
//! (which path an URL takes, when credentials survive a redirect, where an
//! object lands) is testable on its own.

mod keys;
mod redirect;
mod transport;

pub use keys::{destination_key, split_s3_url};
pub use redirect::{RedirectChain, is_redirect, keep_auth};
pub use transport::Transport;
