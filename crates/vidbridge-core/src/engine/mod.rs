//! Decoding engine interface
//!
//! The platform decoder (ExoPlayer, AVPlayer, ...) sits behind [`MediaEngine`].
//! Commands are fire-and-forget; everything the engine learns later arrives
//! as an [`EngineEvent`] through the [`EngineEventSender`] the engine was
//! created with, tagged with the session it was loaded under.

mod simulated;

pub use simulated::{SimulatedEngine, SimulatedEngineFactory};

use crate::{
    player::{Input, InputSender},
    Error, MediaKind, Result, SessionId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::WeakUnboundedSender;
use url::Url;

/// Sending half given to an engine for its notifications.
///
/// Events share the player's input queue with host commands and progress
/// ticks, so they are applied in the order they were sent.
#[derive(Debug, Clone)]
pub struct EngineEventSender {
    inbox: WeakUnboundedSender<Input>,
}

impl EngineEventSender {
    /// Sender into `inbox` that does not keep the queue open by itself
    pub fn new(inbox: &InputSender) -> Self {
        Self {
            inbox: inbox.downgrade(),
        }
    }

    /// Queue `event` for the load identified by `session`
    pub fn send(&self, session: SessionId, event: EngineEvent) -> Result<()> {
        self.inbox
            .upgrade()
            .ok_or(Error::PlayerClosed)?
            .send(Input::Engine { session, event })
            .map_err(|_| Error::PlayerClosed)
    }
}

/// Identifies one seek request so late completions can be matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeekToken(pub u64);

impl std::fmt::Display for SeekToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Readiness of the loaded asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Unknown,
    Ready,
    Failed,
}

/// Buffer observations reported independently by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferSignal {
    /// Playback buffer became empty (true) or was refilled (false)
    BufferEmpty(bool),
    /// Engine expects (true) or no longer expects (false) to keep up
    LikelyToKeepUp(bool),
}

/// Notifications emitted by the decoding engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Single-boolean buffering start
    BufferingStart,
    /// Single-boolean buffering end
    BufferingEnd,
    /// Two-signal buffer observation
    Buffer { signal: BufferSignal },
    /// Asset readiness changed
    Asset { status: AssetStatus },
    /// Unrecoverable decoder failure
    Failed { reason: String },
    /// Natural end of the stream
    EndOfStream,
    /// A seek issued with `token` finished (or was interrupted)
    SeekCompleted { token: SeekToken, finished: bool },
    /// Decoded video dimensions
    VideoSize { width: u32, height: u32 },
}

/// Platform decoding engine
pub trait MediaEngine: Send {
    /// Open a source. Every event about this source must carry `session`;
    /// events from an earlier session are dropped by the controller.
    /// An error leaves the engine unloaded.
    fn load(&mut self, url: &Url, kind: MediaKind, session: SessionId) -> Result<()>;

    /// Start acquiring the asset; readiness arrives as [`EngineEvent::Asset`]
    fn prepare(&mut self);

    fn play(&mut self);

    fn pause(&mut self);

    fn stop(&mut self);

    /// Free decoder resources
    fn release(&mut self);

    /// Asset duration in seconds, if known
    fn duration(&self) -> Option<f64>;

    /// Current position in seconds
    fn position(&self) -> f64;

    fn set_volume(&mut self, volume: f32);

    /// Seek to `seconds`; completion arrives as [`EngineEvent::SeekCompleted`]
    /// carrying `token`
    fn seek_to(&mut self, seconds: f64, token: SeekToken);
}

/// Creates one engine per player instance
pub trait EngineFactory: Send + Sync {
    fn create(&self, events: EngineEventSender) -> Box<dyn MediaEngine>;
}

impl<F> EngineFactory for F
where
    F: Fn(EngineEventSender) -> Box<dyn MediaEngine> + Send + Sync,
{
    fn create(&self, events: EngineEventSender) -> Box<dyn MediaEngine> {
        self(events)
    }
}

/// Duration usable for progress math: finite and positive
pub fn known_duration(engine: &dyn MediaEngine) -> Option<f64> {
    engine.duration().filter(|d| d.is_finite() && *d > 0.0)
}
