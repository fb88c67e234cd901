//! Scripted in-memory narration for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lectern_common::error::{LecternError, LecternResult};
use tokio::sync::{broadcast, watch};

use crate::clock::PlaybackClock;
use crate::narration::{
    AudioTap, NarrationSource, PlayError, PlaybackEvent, ReadyState, TextTrackCue, VideoFrame,
};

/// A narration whose media facts are scripted up front and whose clock runs
/// on tokio time.
pub struct ScriptedNarration {
    label: String,
    clock: Mutex<PlaybackClock>,
    duration_tx: watch::Sender<Option<f64>>,
    muted: AtomicBool,
    reject_unmuted: bool,
    ready_state: Mutex<ReadyState>,
    frame: Option<VideoFrame>,
    text_track: Option<Vec<TextTrackCue>>,
    direct_audio: Option<AudioTap>,
    routed_audio: Option<AudioTap>,
    play_requests: Mutex<Vec<bool>>,
    events: broadcast::Sender<PlaybackEvent>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedNarration {
    pub fn new(duration_secs: Option<f64>) -> Self {
        let (duration_tx, _) = watch::channel(duration_secs);
        let (events, _) = broadcast::channel(16);
        Self {
            label: "scripted".to_string(),
            clock: Mutex::new(PlaybackClock::new(duration_secs)),
            duration_tx,
            muted: AtomicBool::new(true),
            reject_unmuted: false,
            ready_state: Mutex::new(ReadyState::HaveEnoughData),
            frame: None,
            text_track: None,
            direct_audio: None,
            routed_audio: None,
            play_requests: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn with_frame(mut self, frame: VideoFrame) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn with_text_track(mut self, cues: Vec<TextTrackCue>) -> Self {
        self.text_track = Some(cues);
        self
    }

    pub fn with_direct_audio(mut self, tap: AudioTap) -> Self {
        self.direct_audio = Some(tap);
        self
    }

    pub fn with_routed_audio(mut self, tap: AudioTap) -> Self {
        self.routed_audio = Some(tap);
        self
    }

    /// Reject every unmuted play request.
    pub fn rejecting_unmuted(mut self) -> Self {
        self.reject_unmuted = true;
        self
    }

    /// Publish the duration, as a backend does once metadata loads.
    pub fn set_duration(&self, duration_secs: f64) {
        lock(&self.clock).set_duration(Some(duration_secs));
        self.duration_tx.send_replace(Some(duration_secs));
    }

    pub fn set_ready_state(&self, state: ReadyState) {
        *lock(&self.ready_state) = state;
    }

    /// Broadcast a transport event to subscribers.
    pub fn emit(&self, event: PlaybackEvent) {
        let _ = self.events.send(event);
    }

    /// The `muted` flag of every play request so far.
    pub fn play_requests(&self) -> Vec<bool> {
        lock(&self.play_requests).clone()
    }
}

#[async_trait::async_trait]
impl NarrationSource for ScriptedNarration {
    fn label(&self) -> &str {
        &self.label
    }

    fn current_time(&self) -> f64 {
        lock(&self.clock).position()
    }

    fn duration(&self) -> Option<f64> {
        *self.duration_tx.borrow()
    }

    async fn wait_for_duration(&self) -> LecternResult<f64> {
        let mut rx = self.duration_tx.subscribe();
        let duration = *rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| LecternError::playback("narration closed before metadata loaded"))?;
        duration.ok_or_else(|| LecternError::playback("narration duration unavailable"))
    }

    fn play(&self, muted: bool) -> Result<(), PlayError> {
        lock(&self.play_requests).push(muted);
        if !muted && self.reject_unmuted {
            return Err(PlayError::AutoplayRejected);
        }
        self.muted.store(muted, Ordering::SeqCst);
        lock(&self.clock).play();
        Ok(())
    }

    fn pause(&self) {
        lock(&self.clock).pause();
    }

    fn seek(&self, secs: f64) {
        lock(&self.clock).seek(secs);
    }

    fn is_paused(&self) -> bool {
        !lock(&self.clock).is_running()
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    fn ready_state(&self) -> ReadyState {
        *lock(&self.ready_state)
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        self.frame.clone()
    }

    async fn text_track(&self) -> Option<Vec<TextTrackCue>> {
        self.text_track.clone()
    }

    fn direct_audio(&self) -> Option<AudioTap> {
        self.direct_audio.clone()
    }

    async fn route_audio(&self) -> LecternResult<AudioTap> {
        self.routed_audio
            .clone()
            .ok_or_else(|| LecternError::capture("no audio graph available"))
    }

    fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_duration_resolves_after_metadata() {
        let narration = Arc::new(ScriptedNarration::new(None));
        let waiter = {
            let narration = narration.clone();
            tokio::spawn(async move { narration.wait_for_duration().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        narration.set_duration(12.5);
        assert_eq!(waiter.await.unwrap().unwrap(), 12.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmuted_rejection_is_recorded() {
        let narration = ScriptedNarration::new(Some(3.0)).rejecting_unmuted();
        assert_eq!(narration.play(false), Err(PlayError::AutoplayRejected));
        assert!(narration.is_paused());
        assert!(narration.play(true).is_ok());
        assert!(!narration.is_paused());
        assert_eq!(narration.play_requests(), vec![false, true]);
    }
}
