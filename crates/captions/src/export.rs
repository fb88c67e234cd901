//! Caption export in SRT and WebVTT formats.

use std::path::Path;

use lectern_common::error::LecternResult;
use lectern_lecture_model::caption::CaptionTrack;

/// Render a track as SRT.
pub fn generate_srt(track: &CaptionTrack) -> String {
    let mut output = String::new();

    for (i, cue) in track.cues().iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_timestamp(cue.start, ','),
            format_timestamp(cue.end, ','),
        ));
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output
}

/// Render a track as WebVTT.
pub fn generate_vtt(track: &CaptionTrack) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for cue in track.cues() {
        output.push_str(&format!(
            "{} --> {}\n",
            format_timestamp(cue.start, '.'),
            format_timestamp(cue.end, '.'),
        ));
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output
}

/// `HH:MM:SS<sep>mmm`
fn format_timestamp(secs: f64, separator: char) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}{separator}{millis:03}")
}

/// Write a track to `path`; `.vtt` selects WebVTT, anything else SRT.
pub fn save_captions(track: &CaptionTrack, path: &Path) -> LecternResult<()> {
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some("vtt") => generate_vtt(track),
        _ => generate_srt(track),
    };
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), cues = track.len(), "Captions written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_caption_file;
    use lectern_lecture_model::caption::CaptionCue;

    fn track() -> CaptionTrack {
        CaptionTrack::new(vec![
            CaptionCue::new(0.0, 2.5, "Hello world").unwrap(),
            CaptionCue::new(3661.25, 3662.0, "Much later").unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_srt_generation() {
        let srt = generate_srt(&track());
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:02,500\nHello world\n\n"));
        assert!(srt.contains("2\n01:01:01,250 --> 01:01:02,000\nMuch later"));
    }

    #[test]
    fn test_vtt_output_parses_back() {
        let vtt = generate_vtt(&track());
        assert!(vtt.starts_with("WEBVTT\n\n"));
        let cues = parse_caption_file(&vtt);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[1].start, 3661.25);
        assert_eq!(cues[1].text, "Much later");
    }

    #[test]
    fn test_save_picks_format_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let vtt_path = dir.path().join("out.vtt");
        save_captions(&track(), &vtt_path).unwrap();
        assert!(std::fs::read_to_string(&vtt_path)
            .unwrap()
            .starts_with("WEBVTT"));

        let srt_path = dir.path().join("out.srt");
        save_captions(&track(), &srt_path).unwrap();
        assert!(std::fs::read_to_string(&srt_path).unwrap().starts_with("1\n"));
    }
}
