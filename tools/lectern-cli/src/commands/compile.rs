//! Compile a lecture into a downloadable video.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use lectern_capture_engine::{
    DownloadAction, FfmpegEncoderFactory, PlayerInputs, PlayerSession, RecorderSettings,
};
use lectern_captions::CaptionResolver;
use lectern_common::config::AppConfig;
use lectern_lecture_model::{RecordingSession, RecordingStatus};
use lectern_media_core::{resolve_asset_url, NarrationSource};
use lectern_media_ffmpeg::{FfmpegNarration, NarrationOptions, RoutedFetcher};
use lectern_render_engine::{Compositor, VisualAssetBinder};

use super::load_lecture;

pub async fn run(path: PathBuf, output: PathBuf, config: &AppConfig) -> anyhow::Result<()> {
    let Some(lecture) = load_lecture(&path)? else {
        return Ok(());
    };
    for problem in lecture.validate() {
        println!("[WARN] {problem}");
    }
    let lecture = Arc::new(lecture);
    let player_config = &config.player;
    let base_url = config.assets.base_url.clone();

    println!("Compiling lecture: {}", lecture.topic);
    println!("  Output directory: {}", output.display());
    println!(
        "  Resolution: {}x{} @ {}fps",
        player_config.width, player_config.height, player_config.fps
    );

    let fetcher = Arc::new(RoutedFetcher::from_config(&config.assets)?);
    let narration_url = resolve_asset_url(lecture.narration_path(), base_url.as_deref());
    let narration_location = fetcher.media_location(&narration_url);
    tracing::debug!(location = %narration_location, "Opening narration");
    let narration: Arc<dyn NarrationSource> = FfmpegNarration::open(
        narration_location,
        NarrationOptions {
            fps: player_config.fps,
            ..NarrationOptions::default()
        },
    );

    let captions = CaptionResolver::new(fetcher.clone(), base_url.clone())
        .resolve(&lecture, Some(narration.as_ref()))
        .await
        .into_track();
    match &captions {
        Some(track) => println!("  Captions: {} cues, {} words", track.len(), track.total_words()),
        None => println!("  Captions: none (simulated pacing)"),
    }

    let mut images = VisualAssetBinder::new(base_url);
    images.preload(&lecture, fetcher.as_ref()).await;
    println!(
        "  Images: {}/{} loaded",
        images.len(),
        lecture.visualizations.len()
    );

    std::fs::create_dir_all(&output)?;
    let player = PlayerSession::open(
        PlayerInputs {
            lecture: lecture.clone(),
            narration,
            captions,
            images: Arc::new(images),
            compositor: Compositor::from_config(player_config),
        },
        Arc::new(FfmpegEncoderFactory::new()),
        RecorderSettings::from_player(player_config, output),
    );

    if let DownloadAction::Ready { path, .. } = player.download() {
        println!("Already compiled: {}", path.display());
        return Ok(());
    }

    let mut sessions = player.subscribe_session();
    let session = loop {
        tokio::select! {
            changed = sessions.changed() => {
                changed?;
                let session = sessions.borrow_and_update().clone();
                print_progress(&session);
                if !session.is_compiling() {
                    break session;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nCancelling...");
                player.recorder().cancel();
            }
        }
    };
    println!();

    match (session.status, session.artifact) {
        (RecordingStatus::Ready, Some(artifact)) => {
            println!("Compilation complete: {}", artifact.path.display());
            println!(
                "  {} ({}), {:.1} MB",
                artifact.container,
                artifact.codec,
                artifact.bytes as f64 / 1_048_576.0
            );
            Ok(())
        }
        _ => Err(anyhow::anyhow!(
            "Compilation failed: {}",
            session.error.as_deref().unwrap_or("unknown error")
        )),
    }
}

fn print_progress(session: &RecordingSession) {
    let eta = session
        .estimated_secs_remaining
        .map(|secs| format!("{secs:.0}s"))
        .unwrap_or_else(|| "waiting for narration".to_string());
    print!(
        "\r  Progress: {:.1}% (ETA: {eta})  ",
        session.progress_percent
    );
    let _ = std::io::stdout().flush();
}
