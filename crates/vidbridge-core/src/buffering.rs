//! Buffering monitor
//!
//! Folds the engine's buffer observations into a single buffering verdict
//! and maps verdict changes and asset readiness onto status requests. It
//! holds no reference to the status machine; the controller applies the
//! returned requests.

use crate::{
    engine::{AssetStatus, BufferSignal},
    PlaybackStatus,
};
use tracing::debug;

/// Edge of the buffering verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferingChange {
    Started,
    Cleared,
}

/// What an asset readiness report asks the controller to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetAction {
    /// Enter `Error`
    Fail,
    /// Run the play command
    Play,
    /// Run the pause command
    Pause,
    Ignore,
}

#[derive(Debug, Default)]
pub struct BufferingMonitor {
    buffer_empty: bool,
    likely_to_keep_up: bool,
    asset_ready: bool,
    buffering: bool,
}

impl BufferingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything observed for the previous item
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_buffering(&self) -> bool {
        self.buffering
    }

    pub fn is_asset_ready(&self) -> bool {
        self.asset_ready
    }

    /// Feed a two-signal observation.
    ///
    /// Buffering holds while the buffer is empty and the engine does not
    /// expect to keep up.
    pub fn observe(&mut self, signal: BufferSignal) -> Option<BufferingChange> {
        match signal {
            BufferSignal::BufferEmpty(empty) => self.buffer_empty = empty,
            BufferSignal::LikelyToKeepUp(likely) => self.likely_to_keep_up = likely,
        }
        self.set_buffering(self.buffer_empty && !self.likely_to_keep_up)
    }

    /// Feed a single-boolean observation
    pub fn set_buffering(&mut self, buffering: bool) -> Option<BufferingChange> {
        if buffering == self.buffering {
            return None;
        }
        self.buffering = buffering;
        debug!(buffering, "Buffering verdict changed");
        Some(if buffering {
            BufferingChange::Started
        } else {
            BufferingChange::Cleared
        })
    }

    /// Feed an asset readiness report
    pub fn on_asset(&mut self, status: AssetStatus, resume: bool) -> AssetAction {
        match status {
            AssetStatus::Failed => AssetAction::Fail,
            AssetStatus::Ready => {
                self.asset_ready = true;
                if resume {
                    AssetAction::Play
                } else {
                    AssetAction::Pause
                }
            }
            AssetStatus::Unknown => AssetAction::Ignore,
        }
    }
}

/// Status requested by a buffering change, if `current` accepts one
pub fn next_status(
    change: BufferingChange,
    current: PlaybackStatus,
    resume: bool,
) -> Option<PlaybackStatus> {
    if current.ignores_buffering() {
        return None;
    }
    Some(match change {
        BufferingChange::Started => PlaybackStatus::Loading,
        BufferingChange::Cleared if resume => PlaybackStatus::Playing,
        BufferingChange::Cleared => PlaybackStatus::Paused,
    })
}
