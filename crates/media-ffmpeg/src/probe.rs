//! ffprobe / ffmpeg queries.

use std::collections::BTreeSet;
use std::process::Command;

use lectern_common::error::{LecternError, LecternResult};
use serde::Deserialize;

/// Media facts the narration backend needs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaInfo {
    /// Container duration in seconds.
    pub duration_secs: Option<f64>,

    /// Native size of the first video stream.
    pub video_size: Option<(u32, u32)>,

    /// Absolute index of the first audio stream.
    pub audio_stream: Option<usize>,

    /// Whether the container carries a subtitle stream.
    pub has_subtitles: bool,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    index: usize,
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Check whether `binary` is on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Probe a local path or URL with ffprobe.
pub fn probe_media(location: &str) -> LecternResult<MediaInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration:stream=index,codec_type,width,height",
            "-of",
            "json",
        ])
        .arg(location)
        .output()
        .map_err(|e| LecternError::playback(format!("Failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(LecternError::playback(format!(
            "ffprobe failed for {location}: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

fn parse_probe_output(json: &str) -> LecternResult<MediaInfo> {
    let probe: ProbeOutput = serde_json::from_str(json)?;

    let duration_secs = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    let mut info = MediaInfo {
        duration_secs,
        ..MediaInfo::default()
    };
    for stream in probe.streams {
        match stream.codec_type.as_deref() {
            Some("video") if info.video_size.is_none() => {
                if let (Some(w), Some(h)) = (stream.width, stream.height) {
                    if w > 0 && h > 0 {
                        info.video_size = Some((w, h));
                    }
                }
            }
            Some("audio") if info.audio_stream.is_none() => {
                info.audio_stream = Some(stream.index);
            }
            Some("subtitle") => info.has_subtitles = true,
            _ => {}
        }
    }
    Ok(info)
}

/// Names of the encoders the local ffmpeg build provides.
pub fn available_encoders() -> LecternResult<BTreeSet<String>> {
    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .output()
        .map_err(|e| LecternError::encode(format!("Failed to run ffmpeg: {e}")))?;

    if !output.status.success() {
        return Err(LecternError::encode("ffmpeg -encoders failed"));
    }
    Ok(parse_encoder_list(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse `ffmpeg -encoders` output. Entries follow the ` ------` separator as
/// `<flags> <name> <description>`.
fn parse_encoder_list(listing: &str) -> BTreeSet<String> {
    listing
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("------"))
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}
