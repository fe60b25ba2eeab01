use url::Url;

use crate::error::{Result, TransferError};

/// Returns `true` if the HTTP status code indicates a redirect.
///
/// # Recognized Redirect Codes
///
/// - 301: Moved Permanently
/// - 302: Found
/// - 303: See Other
/// - 307: Temporary Redirect
/// - 308: Permanent Redirect
pub fn is_redirect(status: u16) -> bool { matches!(status, 301 | 302 | 303 | 307 | 308) }

/// Whether basic credentials may follow a redirect from `from` to `to`.
///
/// They are kept while the hop stays on one host, or when either end of the
/// hop is the login host. Any other cross-host hop drops them.
pub fn keep_auth(from: &Url, to: &Url, login_host: &str) -> bool {
    let (Some(from_host), Some(to_host)) = (from.host_str(), to.host_str()) else {
        return false;
    };
    from_host.eq_ignore_ascii_case(to_host)
        || from_host.eq_ignore_ascii_case(login_host)
        || to_host.eq_ignore_ascii_case(login_host)
}

/// Hop bookkeeping for one redirect chain.
///
/// Tracks the URL to request next, whether basic credentials still go out,
/// and how many redirects have been followed. Credentials dropped on one hop
/// never come back later in the chain.
#[derive(Debug, Clone)]
pub struct RedirectChain<'a> {
    origin:     String,
    current:    Url,
    login_host: &'a str,
    with_auth:  bool,
    hops:       usize,
    max:        usize,
}

impl<'a> RedirectChain<'a> {
    pub fn new(url: &str, login_host: &'a str, with_auth: bool, max: usize) -> Result<Self> {
        let current = Url::parse(url).map_err(|_| TransferError::InvalidUrl(url.to_string()))?;
        Ok(Self {
            origin: url.to_string(),
            current,
            login_host,
            with_auth,
            hops: 0,
            max,
        })
    }

    pub fn current(&self) -> &Url { &self.current }

    pub fn with_auth(&self) -> bool { self.with_auth }

    pub fn hops(&self) -> usize { self.hops }

    /// Move to the `Location` of a redirect response.
    ///
    /// Relative locations resolve against the current URL. Following more
    /// than `max` redirects fails with [`TransferError::TooManyRedirects`].
    pub fn follow(&mut self, location: Option<&str>) -> Result<&Url> {
        if self.hops >= self.max {
            return Err(TransferError::TooManyRedirects {
                url: self.origin.clone(),
                max: self.max,
            });
        }
        let location = location
            .ok_or_else(|| TransferError::InvalidUrl(format!("redirect from {} without a Location", self.current)))?;
        let next = self
            .current
            .join(location)
            .map_err(|_| TransferError::InvalidUrl(location.to_string()))?;
        self.with_auth = self.with_auth && keep_auth(&self.current, &next, self.login_host);
        self.current = next;
        self.hops += 1;
        Ok(&self.current)
    }
}
