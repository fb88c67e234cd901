use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use lectern_lecture_model::caption::{CaptionCue, CaptionTrack};
use lectern_lecture_model::lecture::{LectureContent, SectionKey};
use lectern_media_core::narration::NarrationSource;
use lectern_media_core::testing::ScriptedNarration;
use lectern_timeline::{spawn_timeline, DriverMode, TimelineDriver, TimelineHandle};

fn load_fixture_lecture() -> Arc<LectureContent> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("sample-lecture")
        .join("lecture.json");
    Arc::new(LectureContent::load(path).expect("fixture lecture should load"))
}

/// Record every distinct section the timeline passes through until it is done.
async fn sections_until_done(handle: &TimelineHandle) -> Vec<SectionKey> {
    let mut rx = handle.subscribe();
    let mut seen = Vec::new();
    loop {
        let state = rx.borrow_and_update().clone();
        if !state.revealed_text.is_empty() && seen.last() != Some(&state.current_section) {
            seen.push(state.current_section);
        }
        if handle.is_done() {
            return seen;
        }
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    return seen;
                }
            }
            _ = handle.wait_done() => {}
        }
    }
}

#[tokio::test(start_paused = true)]
async fn simulated_mode_reveals_every_section_in_order() {
    let lecture = load_fixture_lecture();
    let narration = Arc::new(ScriptedNarration::new(Some(17.0)));
    let driver = TimelineDriver::new(lecture, None, narration.duration());
    let handle = spawn_timeline(driver, narration.clone());
    assert_eq!(handle.mode(), DriverMode::Simulated);

    narration.play(true).unwrap();
    handle.play(true);

    let sections = tokio::time::timeout(Duration::from_secs(120), sections_until_done(&handle))
        .await
        .expect("simulated reveal should finish");

    assert_eq!(
        sections,
        vec![
            SectionKey::Introduction,
            SectionKey::MainBody,
            SectionKey::Conclusion
        ]
    );
    let last = handle.snapshot();
    assert_eq!(
        last.revealed_text,
        "Without photosynthesis there would be no oxygen to breathe."
    );
    // the conclusion cue has no image path
    assert!(last.active_visualization.is_some());
    assert!(!last.has_image());
}

#[tokio::test(start_paused = true)]
async fn caption_mode_follows_narration_clock() {
    let lecture = load_fixture_lecture();
    let cues = vec![
        CaptionCue::new(0.0, 4.0, "Plants turn light into food. This lecture explains how."),
        CaptionCue::new(4.5, 13.0, "Chlorophyll absorbs red and blue light. The energy splits water molecules. Oxygen is released as a by-product. Carbon dioxide is fixed into sugar."),
        CaptionCue::new(13.5, 17.0, "Without photosynthesis there would be no oxygen to breathe."),
    ];
    let track = CaptionTrack::new(cues.into_iter().flatten().collect());
    let narration = Arc::new(ScriptedNarration::new(Some(17.0)));
    let driver = TimelineDriver::new(lecture, track, narration.duration());
    let handle = spawn_timeline(driver, narration.clone());
    assert_eq!(handle.mode(), DriverMode::CaptionDriven);

    narration.play(false).unwrap();
    handle.play(false);

    tokio::time::sleep(Duration::from_secs(8)).await;
    let mid = handle.snapshot();
    assert_eq!(mid.current_section, SectionKey::MainBody);
    assert!(mid.has_image());
    assert!(mid.revealed_text.starts_with("Chlorophyll"));

    tokio::time::timeout(Duration::from_secs(30), handle.wait_done())
        .await
        .expect("caption reveal should finish with the narration");
    assert_eq!(handle.snapshot().current_section, SectionKey::Conclusion);
}
