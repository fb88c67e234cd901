//! Resolve the lecture transcript and optionally export it.

use std::path::PathBuf;
use std::sync::Arc;

use lectern_captions::{save_captions, CaptionResolution, CaptionResolver};
use lectern_common::config::AppConfig;
use lectern_media_core::{resolve_asset_url, NarrationSource};
use lectern_media_ffmpeg::{FfmpegNarration, NarrationOptions, RoutedFetcher};

use super::load_lecture;

pub async fn run(path: PathBuf, export: Option<PathBuf>, config: &AppConfig) -> anyhow::Result<()> {
    let Some(lecture) = load_lecture(&path)? else {
        return Ok(());
    };
    let base_url = config.assets.base_url.clone();
    let fetcher = Arc::new(RoutedFetcher::from_config(&config.assets)?);
    let narration_url = resolve_asset_url(lecture.narration_path(), base_url.as_deref());
    let narration: Arc<dyn NarrationSource> = FfmpegNarration::open(
        fetcher.media_location(&narration_url),
        NarrationOptions::default(),
    );

    let resolution = CaptionResolver::new(fetcher, base_url)
        .resolve(&lecture, Some(narration.as_ref()))
        .await;

    let found = match resolution {
        CaptionResolution::Found(found) => found,
        CaptionResolution::NoCaptions => {
            println!("No captions found for: {}", lecture.topic);
            println!("  The reveal will use simulated pacing.");
            return Ok(());
        }
    };

    let track = &found.track;
    println!("Captions for: {}", lecture.topic);
    println!("  Source: {}", found.source);
    println!("  Cues: {}", track.len());
    println!("  Words: {}", track.total_words());
    println!("  Ends at: {:.2}s", track.end_secs());

    if let Some(export_path) = export {
        save_captions(track, &export_path)
            .map_err(|e| anyhow::anyhow!("Failed to export captions: {e}"))?;
        println!("Exported: {}", export_path.display());
    }

    Ok(())
}
