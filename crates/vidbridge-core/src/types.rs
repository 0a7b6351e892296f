//! Core types for VidBridge

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for one load of a media item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry index of a player instance, as seen by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub usize);

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Player lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// Media loaded, engine not ready yet
    New,
    /// Engine is buffering
    Loading,
    /// Content is playing
    Playing,
    /// Playback paused
    Paused,
    /// Natural end of stream reached with looping disabled
    Finished,
    /// Explicitly stopped, position reset to zero
    Stopped,
    /// Unrecoverable failure until the next load
    Error,
    /// Nothing loaded
    #[default]
    None,
}

impl PlaybackStatus {
    /// Check if transition to target status is valid.
    ///
    /// Re-entering the current status is always valid.
    pub fn can_transition_to(&self, target: PlaybackStatus) -> bool {
        use PlaybackStatus::*;
        if *self == target {
            return true;
        }
        matches!(
            (self, target),
            // From anywhere
            (_, New) | (_, Stopped) | (_, Error) |
            // From New
            (New, Loading) | (New, Playing) | (New, Paused) |
            // From Loading
            (Loading, Playing) | (Loading, Paused) | (Loading, Finished) |
            // From Playing
            (Playing, Paused) | (Playing, Loading) | (Playing, Finished) |
            // From Paused
            (Paused, Playing) | (Paused, Loading) | (Paused, Finished) |
            // From Finished
            (Finished, Playing) | (Finished, Paused) |
            // From Stopped
            (Stopped, Playing)
        )
    }

    /// Integer code the host side understands
    pub fn code(&self) -> u8 {
        match self {
            PlaybackStatus::New => 0,
            PlaybackStatus::Loading => 1,
            PlaybackStatus::Playing => 2,
            PlaybackStatus::Paused => 3,
            PlaybackStatus::Error => 4,
            PlaybackStatus::Stopped => 5,
            PlaybackStatus::None => 6,
            PlaybackStatus::Finished => 7,
        }
    }

    /// Lowercase label
    pub fn name(&self) -> &'static str {
        match self {
            PlaybackStatus::New => "new",
            PlaybackStatus::Loading => "loading",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Finished => "finished",
            PlaybackStatus::Stopped => "stopped",
            PlaybackStatus::Error => "error",
            PlaybackStatus::None => "none",
        }
    }

    pub fn is_playing(&self) -> bool {
        *self == PlaybackStatus::Playing
    }

    pub fn is_loading(&self) -> bool {
        *self == PlaybackStatus::Loading
    }

    /// Playing, paused or buffering
    pub fn is_loaded(&self) -> bool {
        matches!(
            self,
            PlaybackStatus::Playing | PlaybackStatus::Paused | PlaybackStatus::Loading
        )
    }

    /// Statuses that engine buffering/readiness signals may not leave
    pub fn ignores_buffering(&self) -> bool {
        matches!(
            self,
            PlaybackStatus::Stopped
                | PlaybackStatus::Error
                | PlaybackStatus::None
                | PlaybackStatus::Finished
        )
    }
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How the engine should open the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// HLS playlist
    Hls,
    /// Progressive download (mp4, mov, ...)
    Progressive,
}

impl MediaKind {
    /// Detect media kind from the URL path
    pub fn detect(url: &str) -> Self {
        let path = url::Url::parse(url)
            .map(|u| u.path().to_lowercase())
            .unwrap_or_else(|_| url.to_lowercase());
        if path.ends_with(".m3u8") || path.ends_with(".m3u") {
            MediaKind::Hls
        } else {
            MediaKind::Progressive
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Hls => write!(f, "hls"),
            MediaKind::Progressive => write!(f, "progressive"),
        }
    }
}

/// Per-load configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadConfig {
    /// Media URL
    pub url: String,
    /// HLS (true) or progressive (false)
    pub is_streaming: bool,
    /// Start playing as soon as the engine is ready; `None` keeps the
    /// instance's autoplay setting
    pub autoplay: Option<bool>,
    /// Restart from zero at end of stream
    #[serde(rename = "loop")]
    pub looping: bool,
    /// Start muted
    pub silent: bool,
}

impl LoadConfig {
    /// Create a load configuration with looping off
    pub fn new(url: impl Into<String>, is_streaming: bool) -> Self {
        Self {
            url: url.into(),
            is_streaming,
            autoplay: None,
            looping: false,
            silent: false,
        }
    }

    /// Create a load configuration, detecting HLS from the URL
    pub fn detect(url: impl Into<String>) -> Self {
        let url = url.into();
        let is_streaming = MediaKind::detect(&url) == MediaKind::Hls;
        Self::new(url, is_streaming)
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = Some(autoplay);
        self
    }

    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn media_kind(&self) -> MediaKind {
        if self.is_streaming {
            MediaKind::Hls
        } else {
            MediaKind::Progressive
        }
    }
}

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Progress tick period in milliseconds
    pub progress_interval_ms: u64,
    /// Progress fraction treated as end of stream
    pub end_threshold: f64,
    /// Autoplay of a fresh instance
    pub default_autoplay: bool,
    /// Volume applied to new instances
    pub default_volume: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: 1000,
            end_threshold: 0.99,
            default_autoplay: true,
            default_volume: 1.0,
        }
    }
}

impl PlayerConfig {
    /// Progress tick period
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.progress_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "progress_interval_ms must be greater than zero".into(),
            ));
        }
        if !(self.end_threshold > 0.0 && self.end_threshold <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "end_threshold {} outside (0, 1]",
                self.end_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(Error::InvalidConfig(format!(
                "default_volume {} outside [0, 1]",
                self.default_volume
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
