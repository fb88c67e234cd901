//! Asset location and fetching.

use lectern_common::error::{LecternError, LecternResult};

/// Resolve an asset path from a lecture against an optional base.
///
/// - Absolute `http://` / `https://` URLs are returned unchanged.
/// - A leading `/` is stripped from relative paths.
/// - With a base, the result is `<base>/<path>` (one trailing `/` of the base
///   is dropped); without one it is `/<path>`.
/// - An empty path resolves to an empty string.
pub fn resolve_asset_url(path: &str, base: Option<&str>) -> String {
    let path = path.trim();
    if path.is_empty() {
        return String::new();
    }
    if is_remote(path) {
        return path.to_string();
    }

    let cleaned = path.strip_prefix('/').unwrap_or(path);
    if cleaned.is_empty() {
        return String::new();
    }

    let base = base.map(str::trim).unwrap_or_default();
    let base = base.strip_suffix('/').unwrap_or(base);
    if base.is_empty() {
        format!("/{cleaned}")
    } else {
        format!("{base}/{cleaned}")
    }
}

/// Whether `location` is an absolute HTTP(S) URL.
pub fn is_remote(location: &str) -> bool {
    url::Url::parse(location)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Fetches asset bytes by resolved location.
#[async_trait::async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetch the full body at `location`.
    async fn fetch(&self, location: &str) -> LecternResult<Vec<u8>>;

    /// Fetch `location` and decode it as UTF-8 text.
    async fn fetch_text(&self, location: &str) -> LecternResult<String> {
        let bytes = self.fetch(location).await?;
        String::from_utf8(bytes)
            .map_err(|e| LecternError::asset(format!("{location} is not UTF-8 text: {e}")))
    }

    /// Backend name.
    fn name(&self) -> &str;
}
