//! Lecture content and visualization cue types.
//!
//! A lecture is produced once by the content service and handed to the
//! player as JSON. It is never mutated by the player.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One of the three fixed lecture sections, in reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    Introduction,
    MainBody,
    Conclusion,
}

impl SectionKey {
    /// All sections in playback order.
    pub const ALL: [SectionKey; 3] = [
        SectionKey::Introduction,
        SectionKey::MainBody,
        SectionKey::Conclusion,
    ];

    /// Display title drawn above the section text.
    pub fn title(self) -> &'static str {
        match self {
            SectionKey::Introduction => "Introduction",
            SectionKey::MainBody => "Main Body",
            SectionKey::Conclusion => "Conclusion",
        }
    }

    /// The section that follows this one, if any.
    pub fn next(self) -> Option<SectionKey> {
        match self {
            SectionKey::Introduction => Some(SectionKey::MainBody),
            SectionKey::MainBody => Some(SectionKey::Conclusion),
            SectionKey::Conclusion => None,
        }
    }

    /// Position in playback order (0-based).
    pub fn ordinal(self) -> usize {
        match self {
            SectionKey::Introduction => 0,
            SectionKey::MainBody => 1,
            SectionKey::Conclusion => 2,
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Binds one illustrative image to a `(section, paragraph)` position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationCue {
    /// Section the image belongs to.
    pub section: SectionKey,

    /// Paragraph within the section. A cue without an index never matches a
    /// playback position.
    #[serde(default)]
    pub paragraph_index: Option<usize>,

    /// Prompt the image was generated from (used as alt text).
    pub prompt: String,

    /// Asset path of the generated image, if generation succeeded.
    #[serde(default)]
    pub image_path: Option<String>,

    /// Excerpt of the paragraph the image illustrates.
    #[serde(default)]
    pub snippet: Option<String>,
}

impl VisualizationCue {
    /// Whether this cue is bound to the given playback position.
    pub fn matches(&self, section: SectionKey, paragraph_index: usize) -> bool {
        self.section == section && self.paragraph_index == Some(paragraph_index)
    }

    /// Whether the cue carries an image to show.
    pub fn has_image(&self) -> bool {
        self.image_path
            .as_deref()
            .is_some_and(|path| !path.trim().is_empty())
    }
}

/// A generated lecture (`lecture.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LectureContent {
    /// Lecture topic; also used to derive the download filename.
    pub topic: String,

    /// Section texts.
    #[serde(default)]
    pub introduction: String,
    #[serde(default)]
    pub main_body: String,
    #[serde(default)]
    pub conclusion: String,

    /// Illustrations in the order the content service produced them.
    #[serde(default)]
    pub visualizations: Vec<VisualizationCue>,

    /// Narration (avatar video + audio) asset path.
    #[serde(alias = "narration_path")]
    pub video_path: String,

    /// Explicit transcript asset path.
    #[serde(default, alias = "captions_path")]
    pub captions_url: Option<String>,
}

impl LectureContent {
    /// Load a lecture from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LectureError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| LectureError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| LectureError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Raw text of one section.
    pub fn section_text(&self, section: SectionKey) -> &str {
        match section {
            SectionKey::Introduction => &self.introduction,
            SectionKey::MainBody => &self.main_body,
            SectionKey::Conclusion => &self.conclusion,
        }
    }

    /// Narration asset path.
    pub fn narration_path(&self) -> &str {
        &self.video_path
    }

    /// Explicit transcript path, ignoring blank values.
    pub fn captions_path(&self) -> Option<&str> {
        self.captions_url
            .as_deref()
            .filter(|path| !path.trim().is_empty())
    }

    /// The visualization bound to a playback position.
    ///
    /// When several cues name the same position, the first one in lecture
    /// order wins.
    pub fn visualization_at(
        &self,
        section: SectionKey,
        paragraph_index: usize,
    ) -> Option<&VisualizationCue> {
        self.visualizations
            .iter()
            .find(|viz| viz.matches(section, paragraph_index))
    }

    /// Whether every section is empty.
    pub fn is_blank(&self) -> bool {
        SectionKey::ALL
            .iter()
            .all(|section| self.section_text(*section).trim().is_empty())
    }

    /// Filename offered for the compiled video.
    ///
    /// Every character of the topic that is not an ASCII letter or digit is
    /// replaced with `_`.
    pub fn download_filename(&self, extension: &str) -> String {
        let stem: String = self
            .topic
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("{stem}_lecture.{extension}")
    }

    /// Report structural problems that would make the lecture unplayable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.video_path.trim().is_empty() {
            errors.push("Lecture has no narration asset (video_path is empty)".to_string());
        }
        if self.is_blank() {
            errors.push("Lecture has no section text".to_string());
        }
        for (i, viz) in self.visualizations.iter().enumerate() {
            if viz.paragraph_index.is_none() {
                errors.push(format!(
                    "Visualization #{i} ({}) has no paragraph index and will never be shown",
                    viz.section
                ));
            }
        }
        errors
    }
}

/// Errors that can occur when loading a lecture.
#[derive(Debug, thiserror::Error)]
pub enum LectureError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[cfg(test)]
pub(crate) fn sample_lecture() -> LectureContent {
    LectureContent {
        topic: "Photosynthesis 101".to_string(),
        introduction: "A.\n\nB.".to_string(),
        main_body: "Light is absorbed. Sugar is made.".to_string(),
        conclusion: "Plants are neat.".to_string(),
        visualizations: vec![VisualizationCue {
            section: SectionKey::MainBody,
            paragraph_index: Some(0),
            prompt: "a leaf under sunlight".to_string(),
            image_path: Some("static/images/leaf.png".to_string()),
            snippet: None,
        }],
        video_path: "static/video/lecture.mp4".to_string(),
        captions_url: None,
    }
}
