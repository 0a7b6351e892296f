//! Seek coordination
//!
//! At most one seek is outstanding per instance. A newer request supersedes
//! the older one and the older completion is ignored when it arrives. The
//! zero-seek used by stop and loop restart is fire-and-forget and never
//! marks the instance as seeking.

use crate::engine::{known_duration, MediaEngine, SeekToken};
use serde::Serialize;
use tracing::debug;

/// Outstanding seek request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PendingSeek {
    pub token: SeekToken,
    /// Clamped target fraction
    pub fraction: f64,
    /// Target in seconds
    pub target: f64,
    /// Whether playback resumes once the seek lands
    pub resume: bool,
}

/// Result of a seek request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekOutcome {
    /// Immediate seek to the start
    Zero(SeekToken),
    /// Asynchronous seek issued to the engine
    Started(PendingSeek),
    /// Duration unknown, nothing issued
    NoDuration,
}

/// Result of matching an engine completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekCompletion {
    /// The outstanding seek landed
    Done { resume: bool },
    /// The outstanding seek was interrupted by the engine
    Interrupted,
    /// Completion of a superseded or cancelled seek
    Stale,
}

#[derive(Debug, Default)]
pub struct SeekCoordinator {
    next_token: u64,
    pending: Option<PendingSeek>,
}

impl SeekCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_seeking(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingSeek> {
        self.pending.as_ref()
    }

    /// Clamp a requested fraction into [0, 1]; NaN maps to 0
    pub fn clamp(fraction: f64) -> f64 {
        if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        }
    }

    fn mint(&mut self) -> SeekToken {
        self.next_token += 1;
        SeekToken(self.next_token)
    }

    /// Seek to `fraction` of the known duration
    pub fn seek(
        &mut self,
        fraction: f64,
        resume: bool,
        engine: &mut dyn MediaEngine,
    ) -> SeekOutcome {
        let fraction = Self::clamp(fraction);
        if fraction == 0.0 {
            return SeekOutcome::Zero(self.seek_to_zero(engine));
        }

        let Some(duration) = known_duration(engine) else {
            debug!(fraction, "Seek ignored, duration unknown");
            return SeekOutcome::NoDuration;
        };

        if let Some(previous) = self.pending.take() {
            debug!(token = %previous.token, "Seek superseded");
        }

        let pending = PendingSeek {
            token: self.mint(),
            fraction,
            target: fraction * duration,
            resume,
        };
        self.pending = Some(pending);
        engine.seek_to(pending.target, pending.token);
        SeekOutcome::Started(pending)
    }

    /// Seek to the start immediately, dropping any outstanding seek
    pub fn seek_to_zero(&mut self, engine: &mut dyn MediaEngine) -> SeekToken {
        self.cancel();
        let token = self.mint();
        engine.seek_to(0.0, token);
        token
    }

    /// Record a play/pause issued while a seek is outstanding
    pub fn set_resume(&mut self, resume: bool) {
        if let Some(pending) = self.pending.as_mut() {
            pending.resume = resume;
        }
    }

    /// Match an engine completion against the outstanding seek
    pub fn complete(&mut self, token: SeekToken, finished: bool) -> SeekCompletion {
        match self.pending {
            Some(pending) if pending.token == token => {
                self.pending = None;
                if finished {
                    SeekCompletion::Done {
                        resume: pending.resume,
                    }
                } else {
                    SeekCompletion::Interrupted
                }
            }
            _ => {
                debug!(token = %token, "Stale seek completion");
                SeekCompletion::Stale
            }
        }
    }

    /// Drop the outstanding seek. Returns true if one was outstanding.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                debug!(token = %pending.token, "Seek cancelled");
                true
            }
            None => false,
        }
    }
}
