//! Show lecture information.

use std::path::PathBuf;

use lectern_common::config::AppConfig;
use lectern_lecture_model::SectionKey;
use lectern_media_core::resolve_asset_url;
use lectern_media_ffmpeg::{probe_media, RoutedFetcher};
use lectern_timeline::segment;

use super::load_lecture;

pub fn run(path: PathBuf, probe: bool, json: bool, config: &AppConfig) -> anyhow::Result<()> {
    let Some(lecture) = load_lecture(&path)? else {
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&lecture)?);
        return Ok(());
    }

    println!("Lecture: {}", lecture.topic);
    println!("  Download as: {}", lecture.download_filename("webm"));
    println!();

    println!("Sections:");
    for section in SectionKey::ALL {
        let paragraphs = segment(lecture.section_text(section));
        let chars: usize = paragraphs.iter().map(|p| p.chars().count()).sum();
        println!(
            "  {}: {} paragraphs, {} characters",
            section.title(),
            paragraphs.len(),
            chars
        );
    }
    println!();

    println!("Visualizations: {}", lecture.visualizations.len());
    for viz in &lecture.visualizations {
        let position = viz
            .paragraph_index
            .map(|i| format!("paragraph {i}"))
            .unwrap_or_else(|| "unplaced".to_string());
        let image = viz.image_path.as_deref().unwrap_or("(no image)");
        println!("  {} {position}: {image}", viz.section.title());
    }
    println!();

    println!("Assets:");
    println!("  Narration: {}", lecture.narration_path());
    println!(
        "  Captions: {}",
        lecture.captions_path().unwrap_or("(derived from narration)")
    );

    if probe {
        let fetcher = RoutedFetcher::from_config(&config.assets)?;
        let url = resolve_asset_url(lecture.narration_path(), config.assets.base_url.as_deref());
        let location = fetcher.media_location(&url);
        match probe_media(&location) {
            Ok(media) => {
                let duration = media
                    .duration_secs
                    .map(|d| format!("{d:.2}s"))
                    .unwrap_or_else(|| "unknown".to_string());
                println!("  Duration: {duration}");
                if let Some((w, h)) = media.video_size {
                    println!("  Video: {w}x{h}");
                }
                println!(
                    "  Audio: {}",
                    if media.audio_stream.is_some() { "yes" } else { "no" }
                );
                println!(
                    "  Embedded subtitles: {}",
                    if media.has_subtitles { "yes" } else { "no" }
                );
            }
            Err(e) => println!("  [WARN] Probe failed: {e}"),
        }
    }

    let problems = lecture.validate();
    if !problems.is_empty() {
        println!();
        println!("Problems:");
        for problem in problems {
            println!("  [WARN] {problem}");
        }
    }

    Ok(())
}
