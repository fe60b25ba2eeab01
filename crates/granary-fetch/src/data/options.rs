use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a transfer run.
///
/// # Examples
///
/// ```
/// use granary_fetch::TransferOptions;
/// use std::time::Duration;
///
/// let options = TransferOptions::default()
///     .chunk_size(16 * 1024 * 1024)
///     .timeout(Duration::from_secs(600))
///     .header("Echo-Token", "abc");
/// ```
#[derive(Clone)]
pub struct TransferOptions {
    /// Skip every transfer and ledger write; report `Skipped(DryRun)`.
    ///
    /// Default: false
    pub dry_run: bool,

    /// Size of each multipart upload part in bytes.
    ///
    /// Every part except the last is exactly this size. S3 destinations
    /// require at least 5 MiB.
    ///
    /// Default: 8 MiB
    pub chunk_size: usize,

    /// Upper bound on a single artifact's transfer, ledger write excluded.
    ///
    /// Default: 1 hour
    pub timeout: Duration,

    /// Headers sent with every streamed request, redirects included.
    ///
    /// Default: empty
    pub headers: Arc<[(String, String)]>,
}

impl fmt::Debug for TransferOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferOptions")
            .field("dry_run", &self.dry_run)
            .field("chunk_size", &self.chunk_size)
            .field("timeout", &self.timeout)
            .field("headers", &self.headers.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            dry_run:    false,
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            timeout:    Duration::from_secs(3600),
            headers:    Arc::new([]),
        }
    }
}

impl TransferOptions {
    pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut headers = self.headers.to_vec();
        headers.push((key.into(), value.into()));
        self.headers = headers.into();
        self
    }

    /// Attach the run token the data host expects on streamed requests.
    #[must_use]
    pub fn echo_token(self, token: impl Into<String>) -> Self { self.header("Echo-Token", token) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = TransferOptions::default();
        assert!(!options.dry_run);
        assert_eq!(options.chunk_size, 8 * 1024 * 1024);
        assert!(options.headers.is_empty());
    }

    #[test]
    fn test_builder_chain() {
        let options = TransferOptions::default()
            .dry_run(true)
            .chunk_size(0)
            .echo_token("tok");
        assert!(options.dry_run);
        assert_eq!(options.chunk_size, 1);
        assert_eq!(&*options.headers, &[("Echo-Token".to_string(), "tok".to_string())]);
    }

    #[test]
    fn test_debug_hides_header_values() {
        let rendered = format!("{:?}", TransferOptions::default().echo_token("secret"));
        assert!(rendered.contains("Echo-Token"));
        assert!(!rendered.contains("secret"));
    }
}
