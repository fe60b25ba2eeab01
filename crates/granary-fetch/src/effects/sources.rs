use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::StreamExt;
use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use url::Url;

use super::http::HttpClient;
use crate::core::destination_key;
use crate::error::{Result, TransferError};

/// Read-side object stores for bulk copies, one per source bucket.
///
/// # Implementations
///
/// - [`VendedS3Stores`]: S3 with credentials from a vending endpoint
/// - Fixed in-memory stores for testing
pub trait SourceStores: Send + Sync {
    fn store(&self, bucket: &str) -> impl Future<Output = Result<Arc<dyn ObjectStore>>> + Send;
}

/// Temporary S3 credentials handed out by the data provider.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendedCredentials {
    pub access_key_id:     String,
    pub secret_access_key: String,
    pub session_token:     String,
    #[serde(default)]
    pub expiration:        Option<String>,
}

impl fmt::Debug for VendedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VendedCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Largest JSON body read from a credentials endpoint.
const MAX_JSON_BODY: usize = 64 * 1024;

async fn fetch_json<C, T>(http: &C, url: &str) -> Result<T>
where
    C: HttpClient,
    T: DeserializeOwned,
{
    let mut body = http.get(url, &[]).await?;
    let declared = body.content_length.unwrap_or(0).min(MAX_JSON_BODY as u64);
    let mut buffer = Vec::with_capacity(declared as usize);
    while let Some(chunk) = body.stream.next().await {
        let chunk = chunk?;
        if buffer.len() + chunk.len() > MAX_JSON_BODY {
            return Err(TransferError::BodyTooLarge {
                url:   url.to_string(),
                limit: MAX_JSON_BODY,
            });
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(serde_json::from_slice(&buffer)?)
}

/// S3 source stores built from credentials vended over the session.
///
/// Credentials are requested at most once per run, on first use; stores
/// are cached per bucket.
pub struct VendedS3Stores<C> {
    http:        C,
    url:         String,
    region:      String,
    credentials: OnceCell<VendedCredentials>,
    stores:      Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl<C: HttpClient> VendedS3Stores<C> {
    pub const DEFAULT_REGION: &str = "us-west-2";

    pub fn new(http: C, credentials_url: impl Into<String>) -> Self {
        Self {
            http,
            url: credentials_url.into(),
            region: Self::DEFAULT_REGION.to_string(),
            credentials: OnceCell::new(),
            stores: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    async fn credentials(&self) -> Result<&VendedCredentials> {
        self.credentials
            .get_or_try_init(|| async {
                let credentials: VendedCredentials = fetch_json(&self.http, &self.url)
                    .await
                    .map_err(|e| TransferError::Credentials(e.to_string()))?;
                info!(expiration = ?credentials.expiration, "obtained delegated S3 credentials");
                Ok::<_, TransferError>(credentials)
            })
            .await
    }

    fn cached(&self, bucket: &str) -> Option<Arc<dyn ObjectStore>> {
        self.stores
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(bucket)
            .cloned()
    }
}

impl<C: HttpClient> SourceStores for VendedS3Stores<C> {
    async fn store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        if let Some(store) = self.cached(bucket) {
            return Ok(store);
        }

        let credentials = self.credentials().await?;
        let store: Arc<dyn ObjectStore> = Arc::new(
            AmazonS3Builder::new()
                .with_bucket_name(bucket)
                .with_region(&self.region)
                .with_access_key_id(&credentials.access_key_id)
                .with_secret_access_key(&credentials.secret_access_key)
                .with_token(&credentials.session_token)
                .build()?,
        );
        debug!(bucket, region = %self.region, "opened source bucket");

        let mut stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(stores.entry(bucket.to_string()).or_insert(store)))
    }
}

/// Where transferred artifacts land.
#[derive(Clone)]
pub struct Destination {
    store:  Arc<dyn ObjectStore>,
    prefix: Option<String>,
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("store", &self.store.to_string())
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl Destination {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: Option<String>) -> Self { Self { store, prefix } }

    /// `s3://bucket[/prefix]` or `file:///directory`.
    ///
    /// S3 destinations take credentials from the standard `AWS_*`
    /// environment; file destinations create the directory if needed.
    pub fn parse(url: &str, region: &str) -> Result<Self> {
        let invalid = || TransferError::InvalidUrl(url.to_string());
        let parsed = Url::parse(url).map_err(|_| invalid())?;
        match parsed.scheme() {
            "s3" => {
                let bucket = parsed.host_str().filter(|b| !b.is_empty()).ok_or_else(invalid)?;
                let store = AmazonS3Builder::from_env()
                    .with_bucket_name(bucket)
                    .with_region(region)
                    .build()?;
                let prefix = Some(parsed.path().trim_matches('/').to_string()).filter(|p| !p.is_empty());
                Ok(Self::new(Arc::new(store), prefix))
            }
            "file" => {
                let dir = parsed.to_file_path().map_err(|_| invalid())?;
                std::fs::create_dir_all(&dir)?;
                Ok(Self::new(Arc::new(LocalFileSystem::new_with_prefix(dir)?), None))
            }
            other => Err(TransferError::UnsupportedScheme(other.to_string())),
        }
    }

    pub fn store(&self) -> &dyn ObjectStore { self.store.as_ref() }

    pub fn prefix(&self) -> Option<&str> { self.prefix.as_deref() }

    pub fn key(&self, file_name: &str) -> ObjectPath { ObjectPath::from(destination_key(self.prefix(), file_name)) }
}
