use std::fmt;

/// How an artifact is retrieved, decided by its URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Streamed GET through the authenticated session.
    Https,
    /// Bulk copy from the source bucket with vended credentials.
    S3,
}

impl Transport {
    /// `None` for any scheme other than `https` and `s3`.
    pub fn classify(url: &str) -> Option<Self> {
        let (scheme, _) = url.split_once("://")?;
        if scheme.eq_ignore_ascii_case("https") {
            Some(Self::Https)
        } else if scheme.eq_ignore_ascii_case("s3") {
            Some(Self::S3)
        } else {
            None
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Https => write!(f, "https"),
            Transport::S3 => write!(f, "s3"),
        }
    }
}
