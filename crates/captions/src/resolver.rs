//! Prioritized caption source resolution.

use std::fmt;
use std::sync::{Arc, OnceLock};

use lectern_lecture_model::caption::CaptionTrack;
use lectern_lecture_model::lecture::LectureContent;
use lectern_media_core::asset::{resolve_asset_url, AssetFetcher};
use lectern_media_core::narration::NarrationSource;
use regex::Regex;

use crate::embedded::cues_from_text_track;
use crate::parse::parse_caption_file;

/// One place a transcript may be found, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionCandidate {
    /// The text track inside the narration container.
    EmbeddedTrack,
    /// A standalone WebVTT/SRT file at a resolved location.
    External(String),
}

impl fmt::Display for CaptionCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptionCandidate::EmbeddedTrack => f.write_str("embedded text track"),
            CaptionCandidate::External(location) => f.write_str(location),
        }
    }
}

/// A transcript that parsed into at least one cue.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCaptions {
    pub track: CaptionTrack,
    pub source: CaptionCandidate,
}

/// Outcome of caption resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptionResolution {
    Found(ResolvedCaptions),
    /// No candidate produced cues. Pacing falls back to simulation.
    NoCaptions,
}

impl CaptionResolution {
    pub fn track(&self) -> Option<&CaptionTrack> {
        match self {
            CaptionResolution::Found(found) => Some(&found.track),
            CaptionResolution::NoCaptions => None,
        }
    }

    pub fn into_track(self) -> Option<CaptionTrack> {
        match self {
            CaptionResolution::Found(found) => Some(found.track),
            CaptionResolution::NoCaptions => None,
        }
    }
}

fn mp4_suffix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.mp4($|\?)").expect("mp4 suffix regex should compile"))
}

/// Transcript paths derived from the narration path, in priority order:
/// `<path>.vtt`, `<path with .mp4 → .vtt>`, `<path>.srt`,
/// `<path with .mp4 → .srt>`. A substitution that leaves the path unchanged
/// is dropped.
pub fn derived_caption_paths(narration_path: &str) -> Vec<String> {
    let narration_path = narration_path.trim();
    if narration_path.is_empty() {
        return Vec::new();
    }

    let mut paths = Vec::with_capacity(4);
    for ext in ["vtt", "srt"] {
        paths.push(format!("{narration_path}.{ext}"));
        let substituted = mp4_suffix_regex().replace(narration_path, format!(".{ext}$1"));
        if substituted != narration_path {
            paths.push(substituted.into_owned());
        }
    }
    paths
}

/// Every candidate for a lecture, resolved against `base_url` and
/// deduplicated in order.
pub fn caption_candidates(lecture: &LectureContent, base_url: Option<&str>) -> Vec<CaptionCandidate> {
    let mut candidates = vec![CaptionCandidate::EmbeddedTrack];

    let raw = lecture
        .captions_path()
        .map(str::to_string)
        .into_iter()
        .chain(derived_caption_paths(lecture.narration_path()));
    for path in raw {
        let location = resolve_asset_url(&path, base_url);
        if location.is_empty() {
            continue;
        }
        let candidate = CaptionCandidate::External(location);
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

/// Tries caption candidates in order until one yields cues.
pub struct CaptionResolver {
    fetcher: Arc<dyn AssetFetcher>,
    base_url: Option<String>,
}

impl CaptionResolver {
    pub fn new(fetcher: Arc<dyn AssetFetcher>, base_url: Option<String>) -> Self {
        Self { fetcher, base_url }
    }

    /// Resolve a transcript for `lecture`.
    ///
    /// Fetch and parse failures are logged and skipped; they never surface.
    pub async fn resolve(
        &self,
        lecture: &LectureContent,
        narration: Option<&dyn NarrationSource>,
    ) -> CaptionResolution {
        let candidates = caption_candidates(lecture, self.base_url.as_deref());
        tracing::debug!(candidates = candidates.len(), "Resolving captions");

        for candidate in candidates {
            match self.try_candidate(&candidate, narration).await {
                Ok(track) => {
                    tracing::info!(
                        source = %candidate,
                        cues = track.len(),
                        words = track.total_words(),
                        "Captions resolved"
                    );
                    return CaptionResolution::Found(ResolvedCaptions {
                        track,
                        source: candidate,
                    });
                }
                Err(reason) => {
                    tracing::debug!(source = %candidate, %reason, "Caption candidate skipped");
                }
            }
        }

        tracing::info!("No captions found; using simulated pacing");
        CaptionResolution::NoCaptions
    }

    async fn try_candidate(
        &self,
        candidate: &CaptionCandidate,
        narration: Option<&dyn NarrationSource>,
    ) -> Result<CaptionTrack, String> {
        let cues = match candidate {
            CaptionCandidate::EmbeddedTrack => {
                let narration = narration.ok_or("no narration source")?;
                let raw = narration
                    .text_track()
                    .await
                    .ok_or("narration has no text track")?;
                cues_from_text_track(&raw)
            }
            CaptionCandidate::External(location) => {
                let text = self
                    .fetcher
                    .fetch_text(location)
                    .await
                    .map_err(|e| e.to_string())?;
                parse_caption_file(&text)
            }
        };
        CaptionTrack::new(cues).ok_or_else(|| "no cues".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use lectern_common::error::{LecternError, LecternResult};
    use lectern_media_core::narration::TextTrackCue;
    use lectern_media_core::testing::ScriptedNarration;

    #[derive(Default)]
    struct MapFetcher {
        files: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    impl MapFetcher {
        fn with(mut self, location: &str, body: &str) -> Self {
            self.files.insert(location.to_string(), body.to_string());
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl AssetFetcher for MapFetcher {
        async fn fetch(&self, location: &str) -> LecternResult<Vec<u8>> {
            self.requested.lock().unwrap().push(location.to_string());
            self.files
                .get(location)
                .map(|body| body.as_bytes().to_vec())
                .ok_or_else(|| LecternError::asset(format!("404 {location}")))
        }

        fn name(&self) -> &str {
            "map"
        }
    }

    fn lecture(video: &str, captions: Option<&str>) -> LectureContent {
        LectureContent {
            topic: "t".to_string(),
            introduction: "Intro.".to_string(),
            main_body: String::new(),
            conclusion: String::new(),
            visualizations: Vec::new(),
            video_path: video.to_string(),
            captions_url: captions.map(str::to_string),
        }
    }

    #[test]
    fn test_derived_paths_order() {
        assert_eq!(
            derived_caption_paths("media/lec.mp4"),
            vec![
                "media/lec.mp4.vtt",
                "media/lec.vtt",
                "media/lec.mp4.srt",
                "media/lec.srt"
            ]
        );
        assert_eq!(
            derived_caption_paths("media/lec.mp4?sig=1"),
            vec![
                "media/lec.mp4?sig=1.vtt",
                "media/lec.vtt?sig=1",
                "media/lec.mp4?sig=1.srt",
                "media/lec.srt?sig=1"
            ]
        );
        assert_eq!(
            derived_caption_paths("media/lec.webm"),
            vec!["media/lec.webm.vtt", "media/lec.webm.srt"]
        );
        assert!(derived_caption_paths("  ").is_empty());
    }

    #[test]
    fn test_candidates_resolved_and_deduplicated() {
        let lec = lecture("/media/lec.mp4", Some("media/lec.vtt"));
        let candidates = caption_candidates(&lec, Some("http://api"));
        assert_eq!(
            candidates,
            vec![
                CaptionCandidate::EmbeddedTrack,
                CaptionCandidate::External("http://api/media/lec.vtt".to_string()),
                CaptionCandidate::External("http://api/media/lec.mp4.vtt".to_string()),
                CaptionCandidate::External("http://api/media/lec.mp4.srt".to_string()),
                CaptionCandidate::External("http://api/media/lec.srt".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_first_parseable_candidate_wins() {
        let fetcher = Arc::new(
            MapFetcher::default()
                .with("/media/lec.mp4.vtt", "<html>not captions</html>")
                .with("/media/lec.vtt", "WEBVTT\n\n00:00.000 --> 00:02.000\nHello world\n")
                .with("/media/lec.srt", "1\n00:00:00,000 --> 00:00:01,000\nignored\n"),
        );
        let resolver = CaptionResolver::new(fetcher.clone(), None);

        let resolution = resolver.resolve(&lecture("media/lec.mp4", None), None).await;
        let CaptionResolution::Found(found) = resolution else {
            panic!("expected captions");
        };
        assert_eq!(found.source, CaptionCandidate::External("/media/lec.vtt".to_string()));
        assert_eq!(found.track.cues()[0].text, "Hello world");
        assert_eq!(
            fetcher.requested(),
            vec!["/media/lec.mp4.vtt".to_string(), "/media/lec.vtt".to_string()]
        );
    }

    #[tokio::test]
    async fn test_embedded_track_takes_priority() {
        let fetcher = Arc::new(
            MapFetcher::default().with("/media/lec.vtt", "00:00.000 --> 00:02.000\nexternal\n"),
        );
        let narration = ScriptedNarration::new(Some(5.0)).with_text_track(vec![TextTrackCue {
            start: 0.0,
            end: 1.0,
            text: "<i>embedded</i>".to_string(),
        }]);
        let resolver = CaptionResolver::new(fetcher.clone(), None);

        let resolution = resolver
            .resolve(&lecture("media/lec.mp4", None), Some(&narration))
            .await;
        let track = resolution.into_track().unwrap();
        assert_eq!(track.cues()[0].text, "embedded");
        assert!(fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_no_candidate_is_not_an_error() {
        let fetcher = Arc::new(MapFetcher::default());
        let narration = ScriptedNarration::new(Some(5.0));
        let resolver = CaptionResolver::new(fetcher.clone(), None);

        let resolution = resolver
            .resolve(&lecture("media/lec.mp4", None), Some(&narration))
            .await;
        assert_eq!(resolution, CaptionResolution::NoCaptions);
        assert_eq!(fetcher.requested().len(), 4);
    }
}
