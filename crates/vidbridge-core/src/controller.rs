//! Playback controller - per-instance orchestrator
//!
//! Coordinates:
//! - Status machine transitions
//! - Buffering and readiness signals from the engine
//! - Seek serialization
//! - The progress loop and end-of-stream handling
//!
//! The controller is synchronous and not thread-safe by itself. The player
//! task in [`crate::player`] owns it and feeds it commands, engine events and
//! ticks one at a time.

use crate::{
    buffering::{self, AssetAction, BufferingChange, BufferingMonitor},
    engine::{known_duration, EngineEvent, MediaEngine},
    events::{EventSink, PlayerEvent},
    progress::{ProgressLoop, ProgressSample, Tick, TickOutcome, TickScheduler},
    seek::{SeekCompletion, SeekCoordinator, SeekOutcome},
    status::StatusMachine,
    Error, InstanceId, LoadConfig, PlaybackStatus, PlayerConfig, Result, SessionId,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Point-in-time view of an instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub instance: InstanceId,
    pub status: PlaybackStatus,
    pub position: f64,
    pub duration: f64,
    pub volume: f32,
    pub looping: bool,
    pub autoplay: bool,
    pub is_seeking: bool,
    pub session: Option<SessionId>,
    pub url: Option<String>,
}

/// Controller for one loaded media instance
pub struct PlaybackController {
    instance: InstanceId,
    engine: Box<dyn MediaEngine>,
    status: StatusMachine,
    buffering: BufferingMonitor,
    seek: SeekCoordinator,
    progress: ProgressLoop,
    events: EventSink,
    /// Current load
    source: Option<LoadConfig>,
    session: Option<SessionId>,
    /// Whether playback continues once buffering or a seek completes
    resume: bool,
    autoplay: bool,
    looping: bool,
    volume: f32,
}

impl PlaybackController {
    /// Create a controller with nothing loaded
    pub fn new(
        instance: InstanceId,
        config: &PlayerConfig,
        mut engine: Box<dyn MediaEngine>,
        scheduler: Box<dyn TickScheduler>,
        events: EventSink,
    ) -> Self {
        let volume = config.default_volume.clamp(0.0, 1.0);
        engine.set_volume(volume);

        Self {
            instance,
            engine,
            status: StatusMachine::new(instance, events.clone()),
            buffering: BufferingMonitor::new(),
            seek: SeekCoordinator::new(),
            progress: ProgressLoop::new(
                scheduler,
                config.progress_interval(),
                config.end_threshold,
            ),
            events,
            source: None,
            session: None,
            resume: config.default_autoplay,
            autoplay: config.default_autoplay,
            looping: false,
            volume,
        }
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status.status()
    }

    pub fn is_seeking(&self) -> bool {
        self.seek.is_seeking()
    }

    pub fn resume_intent(&self) -> bool {
        self.resume
    }

    pub fn is_progress_running(&self) -> bool {
        self.progress.is_running()
    }

    /// Accepted progress ticks since creation
    pub fn progress_ticks(&self) -> u64 {
        self.progress.ticks()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn autoplay(&self) -> bool {
        self.autoplay
    }

    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    /// Known duration in seconds, 0 when unknown
    pub fn duration(&self) -> f64 {
        known_duration(self.engine.as_ref()).unwrap_or(0.0)
    }

    /// Position in seconds, clamped to the duration
    pub fn position(&self) -> f64 {
        ProgressSample::read(self.engine.as_ref()).position
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            instance: self.instance,
            status: self.status(),
            position: self.position(),
            duration: self.duration(),
            volume: self.volume,
            looping: self.looping,
            autoplay: self.autoplay,
            is_seeking: self.is_seeking(),
            session: self.session,
            url: self.source.as_ref().map(|s| s.url.clone()),
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Load a media item. Failures put the instance in `Error`.
    #[instrument(skip(self, config), fields(instance = %self.instance, url = %config.url))]
    pub fn load(&mut self, config: LoadConfig) -> Result<()> {
        let session = SessionId::new();
        info!(session_id = %session, kind = %config.media_kind(), "Loading media");

        self.seek.cancel();
        self.progress.stop();
        self.buffering.reset();
        self.session = Some(session);

        self.looping = config.looping;
        if let Some(autoplay) = config.autoplay {
            self.autoplay = autoplay;
        }
        self.resume = self.autoplay;
        if config.silent {
            self.set_volume(0.0);
        }

        let kind = config.media_kind();
        let url = config.url.clone();
        self.source = Some(config);

        let parsed = match Url::parse(&url) {
            Ok(parsed) => parsed,
            Err(err) => {
                let err = Error::load(url, err.to_string());
                self.fail(&err.to_string());
                return Err(err);
            }
        };

        if let Err(err) = self.engine.load(&parsed, kind, session) {
            self.fail(&err.to_string());
            return Err(err);
        }

        self.enter(PlaybackStatus::New);
        self.engine.prepare();
        Ok(())
    }

    /// Start or resume playback
    #[instrument(skip(self), fields(instance = %self.instance))]
    pub fn play(&mut self) {
        match self.status() {
            PlaybackStatus::None | PlaybackStatus::Error => {
                debug!(status = %self.status(), "Play ignored, no playable media");
            }
            PlaybackStatus::Loading => self.set_intent(true),
            PlaybackStatus::New | PlaybackStatus::Paused if !self.buffering.is_asset_ready() => {
                self.set_intent(true)
            }
            // Paused while buffering: wait for the buffer to clear
            PlaybackStatus::Paused if self.buffering.is_buffering() => {
                self.set_intent(true);
                self.enter(PlaybackStatus::Loading);
            }
            PlaybackStatus::Finished => {
                self.seek.seek_to_zero(self.engine.as_mut());
                self.resume_playback();
            }
            _ => self.resume_playback(),
        }
    }

    /// Pause playback. Reports `Paused` even before the engine is ready.
    #[instrument(skip(self), fields(instance = %self.instance))]
    pub fn pause(&mut self) {
        let status = self.status();
        if matches!(status, PlaybackStatus::None | PlaybackStatus::Error) {
            debug!(status = %status, "Pause ignored, no playable media");
            return;
        }

        self.set_intent(false);
        self.progress.stop();
        match status {
            PlaybackStatus::New
            | PlaybackStatus::Loading
            | PlaybackStatus::Playing
            | PlaybackStatus::Paused => {
                self.enter(PlaybackStatus::Paused);
            }
            _ => {}
        }
    }

    /// Stop playback and rewind to zero
    #[instrument(skip(self), fields(instance = %self.instance))]
    pub fn stop(&mut self) {
        if self.status() == PlaybackStatus::None {
            debug!("Stop ignored, nothing loaded");
            return;
        }

        self.seek.cancel();
        self.progress.stop();
        self.engine.stop();
        self.seek.seek_to_zero(self.engine.as_mut());
        self.resume = false;
        self.enter(PlaybackStatus::Stopped);
        self.emit_progress(0.0, self.duration());
    }

    /// Seek to a fraction of the duration, clamped to [0, 1]
    #[instrument(skip(self), fields(instance = %self.instance))]
    pub fn seek(&mut self, fraction: f64) {
        if let Err(err) = self.require_media() {
            debug!(error = %err, "Seek ignored");
            return;
        }

        match self.seek.seek(fraction, self.resume, self.engine.as_mut()) {
            SeekOutcome::Started(pending) => {
                info!(token = %pending.token, target = pending.target, "Seeking");
            }
            SeekOutcome::Zero(token) => debug!(token = %token, "Seeked to zero"),
            SeekOutcome::NoDuration => {}
        }
    }

    /// Seek `seconds` ahead of the current position
    pub fn seek_forward(&mut self, seconds: f64) {
        self.seek_relative(seconds);
    }

    /// Seek `seconds` behind the current position
    pub fn seek_rewind(&mut self, seconds: f64) {
        self.seek_relative(-seconds);
    }

    fn seek_relative(&mut self, delta: f64) {
        if let Some(duration) = known_duration(self.engine.as_ref()) {
            let position = self.position();
            self.seek((position + delta) / duration);
        }
    }

    /// Set volume, clamped to [0, 1]
    pub fn set_volume(&mut self, volume: f32) {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.volume = volume;
        self.engine.set_volume(volume);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.set_volume(if muted { 0.0 } else { 1.0 });
    }

    pub fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Changing autoplay also replaces the resume intent
    pub fn set_autoplay(&mut self, autoplay: bool) {
        self.autoplay = autoplay;
        self.set_intent_only(autoplay);
    }

    /// Tear down: cancel all pending work and free the engine
    #[instrument(skip(self), fields(instance = %self.instance))]
    pub fn release(&mut self) {
        self.stop();
        self.seek.cancel();
        self.progress.stop();
        self.engine.release();
        self.buffering.reset();
        self.source = None;
        self.session = None;
        self.status = StatusMachine::new(self.instance, self.events.clone());
        info!("Instance released");
    }

    // ========================================================================
    // Engine signals and ticks
    // ========================================================================

    /// Apply one engine notification raised for the load `session`.
    ///
    /// Notifications about an earlier load are dropped.
    pub fn on_engine_event(&mut self, session: SessionId, event: EngineEvent) {
        if self.session != Some(session) {
            debug!(instance = %self.instance, session_id = %session, ?event, "Stale engine event dropped");
            return;
        }

        match event {
            EngineEvent::BufferingStart => {
                let change = self.buffering.set_buffering(true);
                self.apply_buffering(change);
            }
            EngineEvent::BufferingEnd => {
                let change = self.buffering.set_buffering(false);
                self.apply_buffering(change);
            }
            EngineEvent::Buffer { signal } => {
                let change = self.buffering.observe(signal);
                self.apply_buffering(change);
            }
            EngineEvent::Asset { status } => self.on_asset(status),
            EngineEvent::Failed { reason } => {
                let err = Error::EngineFailure(reason);
                self.fail(&err.to_string());
            }
            EngineEvent::EndOfStream => {
                if self.seek.is_seeking() {
                    debug!("End of stream ignored while seeking");
                } else if matches!(
                    self.status(),
                    PlaybackStatus::Playing | PlaybackStatus::Paused | PlaybackStatus::Loading
                ) {
                    self.end_of_stream();
                }
            }
            EngineEvent::SeekCompleted { token, finished } => {
                self.on_seek_completed(token, finished)
            }
            EngineEvent::VideoSize { width, height } => {
                debug!(width, height, "Video size changed");
                self.emit(PlayerEvent::VideoSizeChanged {
                    instance: self.instance,
                    width,
                    height,
                });
            }
        }
    }

    /// Apply one progress timer tick
    pub fn on_tick(&mut self, tick: Tick) {
        let outcome = self
            .progress
            .on_tick(tick, self.status(), &self.seek, self.engine.as_ref());

        match outcome {
            TickOutcome::Ignored => {}
            TickOutcome::Suppressed => debug!("Progress suppressed while seeking"),
            TickOutcome::Progress {
                sample,
                end_of_stream,
            } => {
                self.emit_progress(sample.progress, sample.duration);
                if end_of_stream {
                    self.end_of_stream();
                }
            }
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn require_media(&self) -> Result<()> {
        match self.status() {
            PlaybackStatus::None | PlaybackStatus::Error => Err(Error::NoMedia),
            _ => Ok(()),
        }
    }

    fn on_asset(&mut self, status: crate::engine::AssetStatus) {
        match self.buffering.on_asset(status, self.resume) {
            AssetAction::Fail => self.fail("asset failed to load"),
            AssetAction::Ignore => {}
            _ if self.status().ignores_buffering() => {
                debug!(status = %self.status(), "Asset readiness ignored");
            }
            AssetAction::Play => self.play(),
            AssetAction::Pause => self.pause(),
        }
    }

    fn on_seek_completed(&mut self, token: crate::engine::SeekToken, finished: bool) {
        match self.seek.complete(token, finished) {
            SeekCompletion::Done { resume } => {
                debug!(token = %token, "Seek completed");
                if !self.status().is_loading() {
                    let target = if resume {
                        PlaybackStatus::Playing
                    } else {
                        PlaybackStatus::Paused
                    };
                    self.enter(target);
                }
            }
            SeekCompletion::Interrupted => debug!(token = %token, "Seek interrupted"),
            SeekCompletion::Stale => {}
        }
    }

    fn apply_buffering(&mut self, change: Option<BufferingChange>) {
        let Some(change) = change else {
            return;
        };
        match buffering::next_status(change, self.status(), self.resume) {
            Some(target) => {
                self.enter(target);
            }
            None => debug!(status = %self.status(), ?change, "Buffering signal ignored"),
        }
    }

    fn end_of_stream(&mut self) {
        if self.looping {
            info!("End of stream, looping");
            self.seek.seek_to_zero(self.engine.as_mut());
            self.resume_playback();
        } else {
            info!("End of stream");
            self.progress.stop();
            self.engine.pause();
            self.resume = false;
            self.enter(PlaybackStatus::Finished);
        }
    }

    /// Play and (re)start the progress loop from a fresh tick
    fn resume_playback(&mut self) {
        self.set_intent(true);
        let was_running = self.progress.is_running();
        if self.enter(PlaybackStatus::Playing) && was_running {
            self.progress.start();
        }
    }

    fn fail(&mut self, reason: &str) {
        warn!(instance = %self.instance, reason, "Playback error");
        self.seek.cancel();
        self.progress.stop();
        self.resume = false;
        self.enter(PlaybackStatus::Error);
    }

    /// Record intent and forward it to the engine
    fn set_intent(&mut self, resume: bool) {
        if resume {
            self.engine.play();
        } else {
            self.engine.pause();
        }
        self.set_intent_only(resume);
    }

    fn set_intent_only(&mut self, resume: bool) {
        self.resume = resume;
        self.seek.set_resume(resume);
    }

    /// Request a transition and keep the progress loop in step with it
    fn enter(&mut self, target: PlaybackStatus) -> bool {
        if !self.status.request(target) {
            return false;
        }
        if target.is_playing() {
            if !self.progress.is_running() {
                self.progress.start();
            }
        } else {
            self.progress.stop();
        }
        true
    }

    fn emit_progress(&self, progress: f64, duration: f64) {
        self.emit(PlayerEvent::ProgressChanged {
            instance: self.instance,
            progress,
            duration,
        });
    }

    fn emit(&self, event: PlayerEvent) {
        if self.events.send(event).is_err() {
            debug!(instance = %self.instance, "Event dropped, no subscriber");
        }
    }
}
