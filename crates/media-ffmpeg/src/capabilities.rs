//! Tool and encoder detection with user guidance.
//!
//! Lectern shells out to ffmpeg/ffprobe for narration decoding, subtitle
//! extraction and encoding. This module reports what the host provides.

use std::collections::BTreeSet;

use crate::probe::{available_encoders, command_exists};

/// A system capability that Lectern may need.
#[derive(Debug, Clone)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub required: bool,
    pub fix_instructions: Option<String>,
}

/// Check all capabilities and report status.
pub fn check_capabilities() -> Vec<Capability> {
    let ffmpeg = check_binary(
        "ffmpeg",
        "Decodes narration video and encodes compiled lectures",
    );
    let encoders = if ffmpeg.available {
        available_encoders().unwrap_or_default()
    } else {
        BTreeSet::new()
    };

    vec![
        ffmpeg,
        check_binary("ffprobe", "Reads narration duration and stream layout"),
        check_encoder(
            &encoders,
            "libvpx-vp9",
            "VP9 video encoder (preferred WebM output)",
            false,
        ),
        check_encoder(
            &encoders,
            "libvpx",
            "VP8 video encoder (fallback WebM output)",
            false,
        ),
        check_encoder(&encoders, "libopus", "Opus audio encoder for WebM", false),
        check_encoder(
            &encoders,
            "libx264",
            "H.264 video encoder (MP4 fallback output)",
            false,
        ),
        check_any_video_encoder(&encoders),
    ]
}

fn check_binary(binary: &str, description: &str) -> Capability {
    let available = command_exists(binary);
    Capability {
        name: binary.to_string(),
        description: description.to_string(),
        available,
        required: true,
        fix_instructions: if available {
            None
        } else {
            Some(format!(
                "Install FFmpeg so `{binary}` is on PATH: sudo apt install ffmpeg"
            ))
        },
    }
}

fn check_encoder(
    encoders: &BTreeSet<String>,
    encoder: &str,
    description: &str,
    required: bool,
) -> Capability {
    let available = encoders.contains(encoder);
    Capability {
        name: format!("Encoder {encoder}"),
        description: description.to_string(),
        available,
        required,
        fix_instructions: if available {
            None
        } else {
            Some(format!(
                "Use an FFmpeg build with {encoder} enabled (most distribution packages include it)"
            ))
        },
    }
}

fn check_any_video_encoder(encoders: &BTreeSet<String>) -> Capability {
    let available = ["libvpx-vp9", "libvpx", "libx264"]
        .iter()
        .any(|name| encoders.contains(*name));
    Capability {
        name: "Compilation".to_string(),
        description: "At least one supported video encoder".to_string(),
        available,
        required: true,
        fix_instructions: if available {
            None
        } else {
            Some("Install an FFmpeg build with libvpx or libx264".to_string())
        },
    }
}

/// Print a user-friendly capability report.
pub fn print_capability_report(capabilities: &[Capability]) {
    println!("Lectern System Capabilities:");
    println!("{}", "-".repeat(60));

    for cap in capabilities {
        let status = if cap.available {
            "[OK]"
        } else if cap.required {
            "[MISSING - REQUIRED]"
        } else {
            "[MISSING - OPTIONAL]"
        };

        println!("  {} {}: {}", status, cap.name, cap.description);

        if let Some(ref fix) = cap.fix_instructions {
            println!("    Fix: {fix}");
        }
    }
}

/// Whether every required capability is available.
pub fn all_required_available(capabilities: &[Capability]) -> bool {
    capabilities.iter().all(|cap| cap.available || !cap.required)
}
