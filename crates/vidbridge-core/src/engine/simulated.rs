//! Simulated decoding engine
//!
//! Advances its position on the tokio clock, so tests running with a paused
//! runtime see fully deterministic playback. Readiness and seek completions
//! are delivered through the event channel like a real decoder would.

use super::{
    AssetStatus, EngineEvent, EngineEventSender, EngineFactory, MediaEngine, SeekToken,
};
use crate::{Error, MediaKind, Result, SessionId};
use tokio::time::Instant;
use tracing::debug;
use url::Url;

/// In-process engine that plays nothing but keeps time
pub struct SimulatedEngine {
    events: EngineEventSender,
    /// Duration reported once loaded
    media_duration: Option<f64>,
    /// Video dimensions reported on prepare
    video_size: Option<(u32, u32)>,
    /// Reject every load with this reason
    load_failure: Option<String>,
    /// Session of the current source; tags every emitted event
    session: Option<SessionId>,
    loaded: bool,
    /// Position when the clock was last anchored
    anchor_position: f64,
    /// Set while playing
    anchor_time: Option<Instant>,
    volume: f32,
}

impl SimulatedEngine {
    /// Create an engine whose media lasts `duration` seconds
    pub fn new(events: EngineEventSender, duration: Option<f64>) -> Self {
        Self {
            events,
            media_duration: duration,
            video_size: Some((1920, 1080)),
            load_failure: None,
            session: None,
            loaded: false,
            anchor_position: 0.0,
            anchor_time: None,
            volume: 1.0,
        }
    }

    /// Make every load fail
    pub fn with_load_failure(mut self, reason: impl Into<String>) -> Self {
        self.load_failure = Some(reason.into());
        self
    }

    /// Report different dimensions, or none
    pub fn with_video_size(mut self, size: Option<(u32, u32)>) -> Self {
        self.video_size = size;
        self
    }

    pub fn is_playing(&self) -> bool {
        self.anchor_time.is_some()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn emit(&self, event: EngineEvent) {
        let Some(session) = self.session else {
            debug!(?event, "Engine event dropped, nothing loaded yet");
            return;
        };
        if self.events.send(session, event).is_err() {
            debug!("Engine event dropped, player gone");
        }
    }

    fn clamp_position(&self, position: f64) -> f64 {
        match self.duration() {
            Some(duration) => position.clamp(0.0, duration),
            None => position.max(0.0),
        }
    }
}

impl MediaEngine for SimulatedEngine {
    fn load(&mut self, url: &Url, kind: MediaKind, session: SessionId) -> Result<()> {
        if let Some(reason) = &self.load_failure {
            return Err(Error::load(url.as_str(), reason.clone()));
        }
        if !matches!(url.scheme(), "http" | "https" | "file") {
            return Err(Error::load(
                url.as_str(),
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        debug!(url = %url, kind = %kind, session = %session, "Simulated engine loaded");
        self.session = Some(session);
        self.loaded = true;
        self.anchor_position = 0.0;
        self.anchor_time = None;
        Ok(())
    }

    fn prepare(&mut self) {
        if !self.loaded {
            return;
        }
        if let Some((width, height)) = self.video_size {
            self.emit(EngineEvent::VideoSize { width, height });
        }
        self.emit(EngineEvent::Asset {
            status: AssetStatus::Ready,
        });
    }

    fn play(&mut self) {
        if self.loaded && self.anchor_time.is_none() {
            self.anchor_time = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        self.anchor_position = self.position();
        self.anchor_time = None;
    }

    fn stop(&mut self) {
        self.pause();
    }

    fn release(&mut self) {
        self.pause();
        self.loaded = false;
        self.anchor_position = 0.0;
    }

    fn duration(&self) -> Option<f64> {
        if self.loaded {
            self.media_duration
        } else {
            None
        }
    }

    fn position(&self) -> f64 {
        let elapsed = self
            .anchor_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        self.clamp_position(self.anchor_position + elapsed)
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn seek_to(&mut self, seconds: f64, token: SeekToken) {
        self.anchor_position = self.clamp_position(seconds);
        if self.anchor_time.is_some() {
            self.anchor_time = Some(Instant::now());
        }
        self.emit(EngineEvent::SeekCompleted {
            token,
            finished: self.loaded,
        });
    }
}

/// Builds [`SimulatedEngine`]s for a registry
#[derive(Debug, Clone, Default)]
pub struct SimulatedEngineFactory {
    pub duration: Option<f64>,
}

impl SimulatedEngineFactory {
    pub fn new(duration: Option<f64>) -> Self {
        Self { duration }
    }
}

impl EngineFactory for SimulatedEngineFactory {
    fn create(&self, events: EngineEventSender) -> Box<dyn MediaEngine> {
        Box::new(SimulatedEngine::new(events, self.duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{inbox, Input, InputSender, InputStream};
    use std::time::Duration;

    fn url() -> Url {
        Url::parse("https://example.com/clip.mp4").unwrap()
    }

    /// Engine plus its queue; the sender keeps the queue open
    fn engine(duration: Option<f64>) -> (SimulatedEngine, (InputSender, InputStream)) {
        let (tx, rx) = inbox();
        (SimulatedEngine::new(EngineEventSender::new(&tx), duration), (tx, rx))
    }

    async fn next_event(queue: &mut (InputSender, InputStream)) -> (SessionId, EngineEvent) {
        match queue.1.recv().await {
            Some(Input::Engine { session, event }) => (session, event),
            other => panic!("expected an engine event, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_follows_clock() {
        let (mut engine, _queue) = engine(Some(10.0));
        engine
            .load(&url(), MediaKind::Progressive, SessionId::new())
            .unwrap();
        engine.play();
        assert!(engine.is_playing());

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!((engine.position() - 3.0).abs() < 1e-6);

        engine.pause();
        assert!(!engine.is_playing());
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!((engine.position() - 3.0).abs() < 1e-6);

        engine.play();
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(engine.position(), 10.0);
    }

    #[tokio::test]
    async fn test_prepare_reports_ready() {
        let (mut engine, mut queue) = engine(Some(10.0));
        let session = SessionId::new();
        engine.load(&url(), MediaKind::Progressive, session).unwrap();
        engine.prepare();

        assert_eq!(
            next_event(&mut queue).await,
            (
                session,
                EngineEvent::VideoSize {
                    width: 1920,
                    height: 1080
                }
            )
        );
        assert_eq!(
            next_event(&mut queue).await,
            (
                session,
                EngineEvent::Asset {
                    status: AssetStatus::Ready
                }
            )
        );
    }

    #[tokio::test]
    async fn test_events_follow_latest_session() {
        let (mut engine, mut queue) = engine(Some(10.0));
        let first = SessionId::new();
        let second = SessionId::new();
        engine.load(&url(), MediaKind::Progressive, first).unwrap();
        engine.load(&url(), MediaKind::Progressive, second).unwrap();
        engine.seek_to(1.0, SeekToken(1));

        let (session, _) = next_event(&mut queue).await;
        assert_eq!(session, second);
    }

    #[tokio::test]
    async fn test_no_events_before_load() {
        let (mut engine, mut queue) = engine(Some(10.0));
        engine.prepare();
        engine.seek_to(1.0, SeekToken(1));
        assert!(queue.1.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_seek_completes_with_token() {
        let (mut engine, mut queue) = engine(Some(10.0));
        let session = SessionId::new();
        engine.load(&url(), MediaKind::Progressive, session).unwrap();
        engine.seek_to(4.0, SeekToken(7));

        assert_eq!(
            next_event(&mut queue).await,
            (
                session,
                EngineEvent::SeekCompleted {
                    token: SeekToken(7),
                    finished: true
                }
            )
        );
        assert_eq!(engine.position(), 4.0);
    }

    #[test]
    fn test_rejects_unsupported_scheme() {
        let (mut engine, _queue) = engine(Some(10.0));
        let err = engine
            .load(
                &Url::parse("ftp://example.com/a.mp4").unwrap(),
                MediaKind::Progressive,
                SessionId::new(),
            )
            .unwrap_err();
        assert_eq!(err.error_code(), "LOAD");
        assert_eq!(engine.duration(), None);
    }

    #[test]
    fn test_volume_is_kept() {
        let (mut engine, _queue) = engine(None);
        assert_eq!(engine.volume(), 1.0);
        engine.set_volume(0.25);
        assert_eq!(engine.volume(), 0.25);
    }
}
