//! In-memory encoders and fixtures for recorder and player tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use lectern_common::error::{LecternError, LecternResult};
use lectern_lecture_model::lecture::{LectureContent, SectionKey, VisualizationCue};
use lectern_lecture_model::session::EncodedArtifact;

use crate::encoder::{
    output_len, CodecChoice, EncoderFactory, EncoderSettings, EncoderStats, FrameEncoder,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FakeOutput {
    /// Writes a few bytes per frame.
    Bytes,
    /// Writes an empty file.
    Empty,
    /// Refuses to start.
    FailStart,
}

pub(crate) struct MemoryEncoderFactory {
    output: FakeOutput,
    pub frames: Arc<AtomicU64>,
    pub started: Mutex<Vec<EncoderSettings>>,
}

impl MemoryEncoderFactory {
    pub fn new(output: FakeOutput) -> Arc<Self> {
        Arc::new(Self {
            output,
            frames: Arc::new(AtomicU64::new(0)),
            started: Mutex::new(Vec::new()),
        })
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> Vec<EncoderSettings> {
        self.started.lock().unwrap().clone()
    }
}

impl EncoderFactory for MemoryEncoderFactory {
    fn name(&self) -> &str {
        "memory"
    }

    fn select_codec(&self) -> LecternResult<CodecChoice> {
        Ok(CodecChoice::VP9_OPUS)
    }

    fn start(&self, settings: EncoderSettings) -> LecternResult<Box<dyn FrameEncoder>> {
        if self.output == FakeOutput::FailStart {
            return Err(LecternError::encode("no video encoder"));
        }
        self.started.lock().unwrap().push(settings.clone());
        Ok(Box::new(MemoryEncoder {
            settings,
            output: self.output,
            frames: self.frames.clone(),
            stats: EncoderStats::default(),
        }))
    }
}

struct MemoryEncoder {
    settings: EncoderSettings,
    output: FakeOutput,
    frames: Arc<AtomicU64>,
    stats: EncoderStats,
}

impl FrameEncoder for MemoryEncoder {
    fn push_frame(&mut self, rgba: &[u8]) -> LecternResult<()> {
        if rgba.len() != self.settings.frame_len() {
            return Err(LecternError::encode("frame size mismatch"));
        }
        self.stats.frames_captured += 1;
        self.frames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stats(&self) -> EncoderStats {
        self.stats.clone()
    }

    fn finish(self: Box<Self>) -> LecternResult<EncodedArtifact> {
        let body = match self.output {
            FakeOutput::Bytes => vec![7u8; self.stats.frames_captured as usize * 16],
            _ => Vec::new(),
        };
        std::fs::write(&self.settings.output, body)?;
        Ok(EncodedArtifact {
            path: self.settings.output.clone(),
            bytes: output_len(&self.settings.output),
            container: self.settings.codec.container.to_string(),
            codec: self.settings.codec.codecs.to_string(),
            mime_type: self.settings.codec.mime_type.to_string(),
        })
    }
}

pub(crate) fn lecture() -> Arc<LectureContent> {
    Arc::new(LectureContent {
        topic: "Photosynthesis 101".to_string(),
        introduction: "Plants eat light.".to_string(),
        main_body: "Chlorophyll absorbs it.".to_string(),
        conclusion: "Sugar results.".to_string(),
        visualizations: vec![VisualizationCue {
            section: SectionKey::MainBody,
            paragraph_index: Some(0),
            prompt: "chloroplast".to_string(),
            image_path: Some("static/images/chloroplast.png".to_string()),
            snippet: None,
        }],
        video_path: "static/video/photosynthesis.mp4".to_string(),
        captions_url: None,
    })
}
