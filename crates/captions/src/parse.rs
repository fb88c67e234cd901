//! WebVTT / SRT parsing.
//!
//! Both formats are handled by one block parser. Each block is an optional
//! numeric index line, one timing line and one or more text lines, separated
//! from the next block by blank lines. Header lines (`WEBVTT`, `NOTE ...`)
//! and anything else without a timing line are skipped.

use std::sync::OnceLock;

use lectern_lecture_model::caption::CaptionCue;
use regex::Regex;

fn timing_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:(\d{2}):)?(\d{2}):(\d{2})[.,](\d{3})\s*-->\s*(?:(\d{2}):)?(\d{2}):(\d{2})[.,](\d{3})",
        )
        .expect("caption timing regex should compile")
    })
}

fn markup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("markup regex should compile"))
}

/// Remove inline markup tags (`<i>`, `<c.yellow>`, `<00:00:01.000>`) and trim.
pub fn strip_markup(text: &str) -> String {
    markup_regex().replace_all(text, "").trim().to_string()
}

/// Parse a timing line into `(start, end)` seconds.
///
/// Accepts `HH:MM:SS,mmm` and `MM:SS.mmm` forms with either separator.
pub fn parse_timing(line: &str) -> Option<(f64, f64)> {
    let caps = timing_regex().captures(line)?;
    let field = |i: usize| -> f64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0) as f64
    };
    let start = field(1) * 3600.0 + field(2) * 60.0 + field(3) + field(4) / 1000.0;
    let end = field(5) * 3600.0 + field(6) * 60.0 + field(7) + field(8) / 1000.0;
    Some((start, end))
}

/// Parse WebVTT or SRT content into cues, in file order.
///
/// Blocks whose text is empty after markup removal are dropped. Cumulative
/// word offsets are assigned when the cues are collected into a
/// `CaptionTrack`.
pub fn parse_caption_file(src: &str) -> Vec<CaptionCue> {
    let normalized = src.replace('\r', "");
    let lines: Vec<&str> = normalized.split('\n').collect();
    let mut cues = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].trim().is_empty() {
            i += 1;
            continue;
        }
        if is_index_line(lines[i]) {
            i += 1;
            if i >= lines.len() {
                break;
            }
        }
        let Some((start, end)) = parse_timing(lines[i]) else {
            i += 1;
            continue;
        };
        i += 1;

        let mut text_lines = Vec::new();
        while i < lines.len() && !lines[i].trim().is_empty() {
            text_lines.push(lines[i]);
            i += 1;
        }
        let text = strip_markup(&text_lines.join(" "));
        if let Some(cue) = CaptionCue::new(start, end, &text) {
            cues.push(cue);
        }
    }

    cues
}

fn is_index_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_srt() {
        let src = "1\r\n00:00:01,000 --> 00:00:02,500\r\nHello <b>there</b>\r\nfriend\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nSecond\r\n";
        let cues = parse_caption_file(src);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].start, 1.0);
        assert_eq!(cues[0].end, 2.5);
        assert_eq!(cues[0].text, "Hello there friend");
        assert_eq!(cues[0].words.len(), 3);
        assert_eq!(cues[1].text, "Second");
    }

    #[test]
    fn test_parse_vtt_with_header_and_short_timestamps() {
        let src = "WEBVTT\n\nNOTE generated\n\n00:05.250 --> 00:07.000\n<v Narrator>Light is absorbed</v>\n\n01:00:00.000 --> 01:00:01.000\nlate cue\n";
        let cues = parse_caption_file(src);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].start, 5.25);
        assert_eq!(cues[0].end, 7.0);
        assert_eq!(cues[0].text, "Light is absorbed");
        assert_eq!(cues[1].start, 3600.0);
    }

    #[test]
    fn test_empty_cues_are_dropped() {
        let src = "00:00:00.000 --> 00:00:01.000\n<i></i>\n\n00:00:01.000 --> 00:00:02.000\nkept\n";
        let cues = parse_caption_file(src);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "kept");
    }

    #[test]
    fn test_garbage_yields_no_cues() {
        assert!(parse_caption_file("").is_empty());
        assert!(parse_caption_file("<html><body>404</body></html>").is_empty());
        assert!(parse_caption_file("1\n").is_empty());
    }

    #[test]
    fn test_parse_timing_forms() {
        assert_eq!(parse_timing("00:00:01.000 --> 00:00:02.000"), Some((1.0, 2.0)));
        assert_eq!(parse_timing("00:01,500-->00:02,000"), Some((1.5, 2.0)));
        assert_eq!(parse_timing("not a timing line"), None);
    }

    proptest! {
        #[test]
        fn parse_never_panics(src in "\\PC{0,200}") {
            let cues = parse_caption_file(&src);
            for cue in cues {
                prop_assert!(!cue.words.is_empty());
                prop_assert!(cue.end >= cue.start);
            }
        }
    }
}
