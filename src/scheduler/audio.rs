//! Audio playback seam
//!
//! The scheduler never drives audio hardware itself. It asks an
//! [`AudioPlayer`] to start a source and then polls the returned [`Playback`]
//! on every tick until it reports completion or failure. Whatever happens,
//! the adhan phase is bounded by the fallback deadline.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use thiserror::Error;

/// Playback failures; logged by the scheduler, never propagated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("No audio output available")]
    Unavailable,

    #[error("Audio source not found: {0}")]
    SourceNotFound(String),

    #[error("Playback rejected: {0}")]
    Rejected(String),

    #[error("Playback handle disconnected")]
    Disconnected,
}

/// State of one playback as seen by the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackStatus {
    Playing,
    Finished,
    Failed(AudioError),
}

/// A started playback
pub trait Playback {
    fn poll(&mut self) -> PlaybackStatus;

    /// Stop early, e.g. when the phase is skipped
    fn stop(&mut self);
}

/// Something able to start playing a source identifier
pub trait AudioPlayer {
    fn play(&mut self, source: &str) -> Result<Box<dyn Playback>, AudioError>;
}

/// Player for displays without audio output; the adhan phase runs on its timer
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentPlayer;

impl AudioPlayer for SilentPlayer {
    fn play(&mut self, _source: &str) -> Result<Box<dyn Playback>, AudioError> {
        Err(AudioError::Unavailable)
    }
}

/// Events an audio backend reports for a playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Ended,
    Error(AudioError),
}

/// Playback fed by a channel, for backends running on their own thread
pub struct ChannelPlayback {
    events: Receiver<PlaybackEvent>,
    stop: Option<Sender<()>>,
    status: PlaybackStatus,
}

impl ChannelPlayback {
    /// Create a playback plus the sender its backend reports through and the
    /// receiver that observes stop requests
    pub fn channel() -> (Sender<PlaybackEvent>, Receiver<()>, ChannelPlayback) {
        let (event_tx, event_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel();
        let playback = ChannelPlayback {
            events: event_rx,
            stop: Some(stop_tx),
            status: PlaybackStatus::Playing,
        };
        (event_tx, stop_rx, playback)
    }
}

impl Playback for ChannelPlayback {
    fn poll(&mut self) -> PlaybackStatus {
        if self.status != PlaybackStatus::Playing {
            return self.status.clone();
        }
        self.status = match self.events.try_recv() {
            Ok(PlaybackEvent::Ended) => PlaybackStatus::Finished,
            Ok(PlaybackEvent::Error(e)) => PlaybackStatus::Failed(e),
            Err(TryRecvError::Empty) => PlaybackStatus::Playing,
            Err(TryRecvError::Disconnected) => PlaybackStatus::Failed(AudioError::Disconnected),
        };
        self.status.clone()
    }

    fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            // The backend may already be gone
            let _ = stop.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_silent_player_is_unavailable() {
        let mut player = SilentPlayer;
        assert!(matches!(player.play("adhan.mp3"), Err(AudioError::Unavailable)));
    }

    #[test]
    fn test_channel_playback_finishes() {
        let (events, _stop, mut playback) = ChannelPlayback::channel();
        assert_eq!(playback.poll(), PlaybackStatus::Playing);
        events.send(PlaybackEvent::Ended).unwrap();
        assert_eq!(playback.poll(), PlaybackStatus::Finished);
        // Terminal status sticks
        assert_eq!(playback.poll(), PlaybackStatus::Finished);
    }

    #[test]
    fn test_channel_playback_disconnect_is_failure() {
        let (events, _stop, mut playback) = ChannelPlayback::channel();
        drop(events);
        assert_eq!(playback.poll(), PlaybackStatus::Failed(AudioError::Disconnected));
    }

    #[test]
    fn test_stop_notifies_backend() {
        let (_events, stop, mut playback) = ChannelPlayback::channel();
        playback.stop();
        assert!(stop.try_recv().is_ok());
    }
}
