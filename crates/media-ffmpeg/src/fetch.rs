//! Filesystem and HTTP asset fetchers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use lectern_common::config::AssetConfig;
use lectern_common::error::{LecternError, LecternResult};
use lectern_media_core::asset::{is_remote, AssetFetcher};

/// Reads assets from a local directory.
///
/// Locations are resolved asset URLs such as `/static/img/a.png`; the leading
/// `/` is stripped and the rest joined onto the root. Absolute paths that
/// exist on disk are read as-is.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a resolved location onto the filesystem.
    pub fn local_path(&self, location: &str) -> PathBuf {
        let path = Path::new(location);
        if path.is_absolute() && path.exists() {
            return path.to_path_buf();
        }
        let relative = location.trim_start_matches('/');
        self.root.join(relative)
    }
}

#[async_trait::async_trait]
impl AssetFetcher for FsFetcher {
    async fn fetch(&self, location: &str) -> LecternResult<Vec<u8>> {
        let path = self.local_path(location);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(LecternError::FileNotFound { path })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &str {
        "filesystem"
    }
}

/// Fetches assets over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> LecternResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LecternError::asset(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, location: &str) -> LecternResult<Vec<u8>> {
        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(|e| LecternError::asset(format!("Failed to request {location}: {e}")))?
            .error_for_status()
            .map_err(|e| LecternError::asset(format!("{location} returned an error status: {e}")))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LecternError::asset(format!("Failed to read body of {location}: {e}")))?;
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Sends remote locations to HTTP and everything else to the filesystem.
#[derive(Debug, Clone)]
pub struct RoutedFetcher {
    fs: FsFetcher,
    http: HttpFetcher,
}

impl RoutedFetcher {
    pub fn new(fs: FsFetcher, http: HttpFetcher) -> Self {
        Self { fs, http }
    }

    /// Build from asset configuration. The filesystem root defaults to the
    /// current directory.
    pub fn from_config(config: &AssetConfig) -> LecternResult<Self> {
        let root = match &config.root {
            Some(root) => root.clone(),
            None => std::env::current_dir()?,
        };
        let http = HttpFetcher::new(Duration::from_secs(config.request_timeout_secs.max(1)))?;
        Ok(Self::new(FsFetcher::new(root), http))
    }

    /// A location ffmpeg can open directly: remote URLs unchanged, local
    /// locations mapped onto the filesystem root.
    pub fn media_location(&self, location: &str) -> String {
        if is_remote(location) {
            location.to_string()
        } else {
            self.fs.local_path(location).display().to_string()
        }
    }
}

#[async_trait::async_trait]
impl AssetFetcher for RoutedFetcher {
    async fn fetch(&self, location: &str) -> LecternResult<Vec<u8>> {
        if is_remote(location) {
            self.http.fetch(location).await
        } else {
            self.fs.fetch(location).await
        }
    }

    fn name(&self) -> &str {
        "routed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_fetcher_strips_leading_slash() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("static")).unwrap();
        std::fs::write(dir.path().join("static/lec.vtt"), "WEBVTT\n").unwrap();

        let fetcher = FsFetcher::new(dir.path());
        let text = fetcher.fetch_text("/static/lec.vtt").await.unwrap();
        assert_eq!(text, "WEBVTT\n");
    }

    #[tokio::test]
    async fn test_fs_fetcher_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FsFetcher::new(dir.path());
        let err = fetcher.fetch("/static/missing.png").await.unwrap_err();
        assert!(matches!(err, LecternError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_absolute_existing_path_is_used_directly() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.srt");
        std::fs::write(&file, "1\n").unwrap();

        let fetcher = FsFetcher::new("/nonexistent-root");
        let bytes = fetcher.fetch(&file.display().to_string()).await.unwrap();
        assert_eq!(bytes, b"1\n");
    }

    #[test]
    fn test_media_location_maps_local_paths() {
        let fetcher = RoutedFetcher::new(
            FsFetcher::new("/srv/lectern"),
            HttpFetcher::new(Duration::from_secs(5)).unwrap(),
        );
        assert_eq!(
            fetcher.media_location("/static/video/lec.mp4"),
            "/srv/lectern/static/video/lec.mp4"
        );
        assert_eq!(
            fetcher.media_location("https://cdn.example.com/lec.mp4"),
            "https://cdn.example.com/lec.mp4"
        );
    }
}
