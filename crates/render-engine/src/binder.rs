//! Visual asset binding: which image belongs to "now", and its pixels.

use std::collections::HashMap;
use std::sync::Arc;

use lectern_common::error::{LecternError, LecternResult};
use lectern_lecture_model::lecture::{LectureContent, SectionKey, VisualizationCue};
use lectern_media_core::asset::{resolve_asset_url, AssetFetcher};
use tiny_skia::Pixmap;
use tracing::{debug, info, warn};

use crate::paint::pixmap_from_rgba;

/// Decode PNG/JPEG/WebP bytes into a premultiplied pixmap.
pub fn decode_image(bytes: &[u8]) -> LecternResult<Pixmap> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| LecternError::asset(format!("Failed to decode image: {e}")))?
        .to_rgba8();
    let (width, height) = decoded.dimensions();
    pixmap_from_rgba(width, height, decoded.into_raw())
        .ok_or_else(|| LecternError::asset(format!("Image has unusable size {width}x{height}")))
}

/// Resolves visualization cues and holds their decoded images, keyed by
/// resolved URL.
#[derive(Default)]
pub struct VisualAssetBinder {
    base_url: Option<String>,
    images: HashMap<String, Arc<Pixmap>>,
}

impl VisualAssetBinder {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            base_url,
            images: HashMap::new(),
        }
    }

    /// The cue bound to a playback position; the first match wins.
    pub fn resolve<'a>(
        &self,
        lecture: &'a LectureContent,
        section: SectionKey,
        paragraph_index: usize,
    ) -> Option<&'a VisualizationCue> {
        lecture.visualization_at(section, paragraph_index)
    }

    /// Resolved URL of a cue's image.
    pub fn image_url(&self, cue: &VisualizationCue) -> Option<String> {
        let path = cue.image_path.as_deref().filter(|_| cue.has_image())?;
        Some(resolve_asset_url(path, self.base_url.as_deref()))
    }

    /// Fetch and decode every cue image once. Failures are logged and the
    /// cue is left without an image.
    pub async fn preload(&mut self, lecture: &LectureContent, fetcher: &dyn AssetFetcher) {
        let mut loaded = 0usize;
        for cue in &lecture.visualizations {
            let Some(url) = self.image_url(cue) else {
                continue;
            };
            if self.images.contains_key(&url) {
                continue;
            }
            match fetcher.fetch(&url).await.and_then(|bytes| decode_image(&bytes)) {
                Ok(pixmap) => {
                    debug!(url = %url, width = pixmap.width(), height = pixmap.height(), "Image preloaded");
                    self.images.insert(url, Arc::new(pixmap));
                    loaded += 1;
                }
                Err(e) => warn!(url = %url, error = %e, "Skipping visualization image"),
            }
        }
        info!(
            loaded,
            cues = lecture.visualizations.len(),
            fetcher = fetcher.name(),
            "Visualization images preloaded"
        );
    }

    /// The decoded image for a cue, if it was preloaded.
    pub fn image_for(&self, cue: &VisualizationCue) -> Option<&Pixmap> {
        let url = self.image_url(cue)?;
        self.images.get(&url).map(Arc::as_ref)
    }

    pub fn insert(&mut self, url: impl Into<String>, pixmap: Pixmap) {
        self.images.insert(url.into(), Arc::new(pixmap));
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct MapFetcher(HashMap<String, Vec<u8>>);

    #[async_trait::async_trait]
    impl AssetFetcher for MapFetcher {
        async fn fetch(&self, location: &str) -> LecternResult<Vec<u8>> {
            self.0
                .get(location)
                .cloned()
                .ok_or_else(|| LecternError::asset(format!("missing {location}")))
        }

        fn name(&self) -> &str {
            "map"
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn cue(section: SectionKey, index: usize, image: Option<&str>) -> VisualizationCue {
        VisualizationCue {
            section,
            paragraph_index: Some(index),
            prompt: "p".to_string(),
            image_path: image.map(str::to_string),
            snippet: None,
        }
    }

    fn lecture(visualizations: Vec<VisualizationCue>) -> LectureContent {
        LectureContent {
            topic: "t".to_string(),
            introduction: "i".to_string(),
            main_body: "b".to_string(),
            conclusion: "c".to_string(),
            visualizations,
            video_path: "v.mp4".to_string(),
            captions_url: None,
        }
    }

    #[tokio::test]
    async fn test_preload_skips_failures() {
        let lecture = lecture(vec![
            cue(SectionKey::Introduction, 0, Some("/static/a.png")),
            cue(SectionKey::MainBody, 0, Some("static/broken.png")),
            cue(SectionKey::MainBody, 1, Some("static/missing.png")),
            cue(SectionKey::Conclusion, 0, None),
        ]);
        let mut files = HashMap::new();
        files.insert("https://api.test/static/a.png".to_string(), png(4, 2));
        files.insert("https://api.test/static/broken.png".to_string(), b"nope".to_vec());

        let mut binder = VisualAssetBinder::new(Some("https://api.test/".to_string()));
        binder.preload(&lecture, &MapFetcher(files)).await;

        assert_eq!(binder.len(), 1);
        let img = binder.image_for(&lecture.visualizations[0]).unwrap();
        assert_eq!((img.width(), img.height()), (4, 2));
        assert!(binder.image_for(&lecture.visualizations[1]).is_none());
        assert!(binder.image_for(&lecture.visualizations[3]).is_none());
    }

    #[test]
    fn test_resolve_first_match() {
        let lecture = lecture(vec![
            cue(SectionKey::MainBody, 2, Some("first.png")),
            cue(SectionKey::MainBody, 2, Some("second.png")),
        ]);
        let binder = VisualAssetBinder::new(None);
        let hit = binder.resolve(&lecture, SectionKey::MainBody, 2).unwrap();
        assert_eq!(hit.image_path.as_deref(), Some("first.png"));
        assert_eq!(binder.image_url(hit).as_deref(), Some("/first.png"));
        assert!(binder.resolve(&lecture, SectionKey::MainBody, 0).is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_image(b"not an image").is_err());
        assert_eq!(decode_image(&png(3, 5)).unwrap().height(), 5);
    }
}
