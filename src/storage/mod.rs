//! Storage abstraction over object stores.
//!
//! Provides a unified interface for reading source records from and
//! writing Parquet files to S3 or the local filesystem.

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::{AmazonS3Builder, AmazonS3ConfigKey};
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use regex::Regex;
use snafu::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::error::{
    InvalidUrlSnafu, IoSnafu, LocalRootSnafu, ObjectStoreSnafu, S3ConfigSnafu, S3OptionSnafu,
    StorageError,
};

/// A reference-counted storage provider.
pub type StorageProviderRef = Arc<StorageProvider>;

// URL patterns for the supported storage backends
const S3_URL: &str = r"^[sS]3[aA]?://(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+?))?/?$";
const FILE_URI: &str = r"^file://(?P<path>.+)$";
const FILE_PATH: &str = r"^(?P<path>(/|\./).*)$";

fn s3_matcher() -> &'static Regex {
    static MATCHER: OnceLock<Regex> = OnceLock::new();
    MATCHER.get_or_init(|| Regex::new(S3_URL).expect("invalid S3 URL pattern"))
}

fn local_matchers() -> &'static [Regex; 2] {
    static MATCHERS: OnceLock<[Regex; 2]> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        [
            Regex::new(FILE_URI).expect("invalid file URI pattern"),
            Regex::new(FILE_PATH).expect("invalid file path pattern"),
        ]
    })
}

/// Backend configuration parsed from a location URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    S3 {
        bucket: String,
        /// Key prefix inside the bucket, if any.
        key: Option<String>,
    },
    Local {
        path: String,
    },
}

impl BackendConfig {
    /// Parse a location URL into a backend configuration.
    pub fn parse_url(url: &str) -> Result<Self, StorageError> {
        if let Some(caps) = s3_matcher().captures(url) {
            let bucket = caps
                .name("bucket")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let key = caps.name("key").map(|m| m.as_str().to_string());
            return Ok(BackendConfig::S3 { bucket, key });
        }

        if let Some(caps) = local_matchers().iter().find_map(|r| r.captures(url)) {
            let path = caps
                .name("path")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            return Ok(BackendConfig::Local { path });
        }

        InvalidUrlSnafu {
            url: url.to_string(),
        }
        .fail()
    }

    fn key(&self) -> Option<&str> {
        match self {
            BackendConfig::S3 { key, .. } => key.as_deref(),
            BackendConfig::Local { .. } => None,
        }
    }
}

/// Storage provider that abstracts over the supported backends.
#[derive(Clone)]
pub struct StorageProvider {
    config: BackendConfig,
    object_store: Arc<dyn ObjectStore>,
    canonical_url: String,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.canonical_url)
    }
}

impl StorageProvider {
    /// Create a storage provider for the given URL with storage options.
    pub fn for_url_with_options(
        url: &str,
        options: &HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        let config = BackendConfig::parse_url(url)?;
        match &config {
            BackendConfig::S3 { bucket, .. } => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                for (key, value) in options {
                    let option_key = AmazonS3ConfigKey::from_str(key)
                        .context(S3OptionSnafu { key: key.clone() })?;
                    builder = builder.with_config(option_key, value);
                }
                let store = builder.build().context(S3ConfigSnafu)?;
                Ok(Self {
                    canonical_url: url.to_string(),
                    config,
                    object_store: Arc::new(store),
                })
            }
            BackendConfig::Local { path } => {
                // The object store canonicalizes its root, so it must exist
                std::fs::create_dir_all(path).context(IoSnafu)?;
                let store = LocalFileSystem::new_with_prefix(path)
                    .context(LocalRootSnafu { path: path.clone() })?;
                Ok(Self {
                    canonical_url: url.to_string(),
                    config,
                    object_store: Arc::new(store),
                })
            }
        }
    }

    /// Recursively list files under the provider's root.
    ///
    /// Returns paths relative to the configured key prefix so they can be
    /// passed back to [`get`](Self::get) and [`put`](Self::put).
    pub async fn list(&self) -> Result<Vec<Path>, StorageError> {
        let prefix: Option<Path> = self.config.key().map(Path::from);
        let skip = prefix
            .as_ref()
            .map(|p| p.parts().count())
            .unwrap_or_default();

        let files: Vec<Path> = self
            .object_store
            .list(prefix.as_ref())
            .map_ok(|meta| meta.location.parts().skip(skip).collect())
            .try_collect()
            .await
            .context(ObjectStoreSnafu)?;

        debug!("Listed {} objects under {}", files.len(), self.canonical_url);
        Ok(files)
    }

    /// Get the contents of a file.
    pub async fn get(&self, path: &Path) -> Result<Bytes, StorageError> {
        self.object_store
            .get(&self.qualify_path(path))
            .await
            .context(ObjectStoreSnafu)?
            .bytes()
            .await
            .context(ObjectStoreSnafu)
    }

    /// Put bytes to a path.
    pub async fn put(&self, path: &Path, bytes: Bytes) -> Result<(), StorageError> {
        self.object_store
            .put(&self.qualify_path(path), PutPayload::from(bytes))
            .await
            .context(ObjectStoreSnafu)?;
        Ok(())
    }

    /// Qualify a path with the configured key prefix.
    fn qualify_path<'a>(&self, path: &'a Path) -> Cow<'a, Path> {
        match self.config.key() {
            Some(prefix) => Cow::Owned(Path::from(prefix).parts().chain(path.parts()).collect()),
            None => Cow::Borrowed(path),
        }
    }

    /// The URL this provider was created from.
    pub fn url(&self) -> &str {
        &self.canonical_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s3_url_parsing() {
        let config = BackendConfig::parse_url("s3://mybucket/song_data").unwrap();
        assert_eq!(
            config,
            BackendConfig::S3 {
                bucket: "mybucket".to_string(),
                key: Some("song_data".to_string()),
            }
        );
    }

    #[test]
    fn test_s3a_url_without_key() {
        let config = BackendConfig::parse_url("s3a://mybucket/").unwrap();
        assert_eq!(
            config,
            BackendConfig::S3 {
                bucket: "mybucket".to_string(),
                key: None,
            }
        );
    }

    #[test]
    fn test_local_paths() {
        let config = BackendConfig::parse_url("/data/analytics").unwrap();
        assert_eq!(
            config,
            BackendConfig::Local {
                path: "/data/analytics".to_string()
            }
        );

        let config = BackendConfig::parse_url("file:///data/analytics").unwrap();
        assert_eq!(
            config,
            BackendConfig::Local {
                path: "/data/analytics".to_string()
            }
        );
    }

    #[test]
    fn test_unrecognized_url_is_rejected() {
        assert!(BackendConfig::parse_url("gopher://nope").is_err());
    }

    #[tokio::test]
    async fn test_local_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let provider =
            StorageProvider::for_url_with_options(dir.path().to_str().unwrap(), &HashMap::new())
                .unwrap();

        let path = Path::from("a/b.json");
        provider
            .put(&path, Bytes::from_static(b"{\"x\":1}"))
            .await
            .unwrap();

        let listed = provider.list().await.unwrap();
        assert_eq!(listed, vec![Path::from("a/b.json")]);

        let bytes = provider.get(&path).await.unwrap();
        assert_eq!(&bytes[..], b"{\"x\":1}");
    }
}
