//! Progress loop
//!
//! A periodic timer samples position/duration while the instance is playing.
//! The timer itself comes from an injected [`TickScheduler`], so tests drive
//! ticks by hand and production uses the tokio clock. Ticks carry the
//! generation they were scheduled under; ticks from a cancelled or replaced
//! schedule are discarded.

use crate::{
    engine::{known_duration, MediaEngine},
    player::{Input, InputSender},
    seek::SeekCoordinator,
    Error, PlaybackStatus, Result,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

/// One timer firing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
}

/// Delivers ticks onto the player's input queue, behind anything
/// already waiting there
#[derive(Debug, Clone)]
pub struct TickSender {
    inbox: WeakUnboundedSender<Input>,
}

impl TickSender {
    pub fn new(inbox: &InputSender) -> Self {
        Self {
            inbox: inbox.downgrade(),
        }
    }

    pub fn send(&self, tick: Tick) -> Result<()> {
        self.inbox
            .upgrade()
            .ok_or(Error::PlayerClosed)?
            .send(Input::Tick(tick))
            .map_err(|_| Error::PlayerClosed)
    }
}

/// Periodic timer capability
pub trait TickScheduler: Send {
    /// Deliver ticks tagged `generation` every `period`, replacing any
    /// running schedule
    fn start(&mut self, period: Duration, generation: u64);

    /// Stop delivering ticks
    fn cancel(&mut self);
}

/// Scheduler backed by a tokio interval task
pub struct TokioTickScheduler {
    ticks: TickSender,
    task: Option<JoinHandle<()>>,
}

impl TokioTickScheduler {
    pub fn new(ticks: TickSender) -> Self {
        Self { ticks, task: None }
    }
}

impl TickScheduler for TokioTickScheduler {
    fn start(&mut self, period: Duration, generation: u64) {
        self.cancel();
        let ticks = self.ticks.clone();
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if ticks.send(Tick { generation }).is_err() {
                    break;
                }
            }
        }));
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TokioTickScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Scheduler that only records what it was asked to do
#[derive(Debug, Clone, Default)]
pub struct ManualTickScheduler {
    running: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    starts: Arc<AtomicU64>,
}

impl ManualTickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Tick as the running schedule would deliver it
    pub fn tick(&self) -> Tick {
        Tick {
            generation: self.generation.load(Ordering::SeqCst),
        }
    }

    /// Number of times a schedule was started
    pub fn starts(&self) -> u64 {
        self.starts.load(Ordering::SeqCst)
    }
}

impl TickScheduler for ManualTickScheduler {
    fn start(&mut self, _period: Duration, generation: u64) {
        self.generation.store(generation, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn cancel(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Position/duration reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressSample {
    /// Seconds, clamped to [0, duration]; 0 when duration is unknown
    pub position: f64,
    /// Seconds; 0 when unknown
    pub duration: f64,
    /// position / duration, or 0
    pub progress: f64,
}

impl ProgressSample {
    pub fn read(engine: &dyn MediaEngine) -> Self {
        match known_duration(engine) {
            Some(duration) => {
                let position = engine.position();
                let position = if position.is_finite() {
                    position.clamp(0.0, duration)
                } else {
                    0.0
                };
                Self {
                    position,
                    duration,
                    progress: position / duration,
                }
            }
            None => Self {
                position: 0.0,
                duration: 0.0,
                progress: 0.0,
            },
        }
    }
}

/// What a tick asks the controller to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Stale tick, or not playing
    Ignored,
    /// A seek is outstanding
    Suppressed,
    /// Emit the sample; run the end sequence when `end_of_stream`
    Progress {
        sample: ProgressSample,
        end_of_stream: bool,
    },
}

pub struct ProgressLoop {
    scheduler: Box<dyn TickScheduler>,
    period: Duration,
    end_threshold: f64,
    generation: u64,
    running: bool,
    ticks: u64,
}

impl ProgressLoop {
    pub fn new(scheduler: Box<dyn TickScheduler>, period: Duration, end_threshold: f64) -> Self {
        Self {
            scheduler,
            period,
            end_threshold,
            generation: 0,
            running: false,
            ticks: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Accepted ticks since creation
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Start, or restart, the timer
    pub fn start(&mut self) {
        self.generation += 1;
        self.running = true;
        self.scheduler.start(self.period, self.generation);
        debug!(generation = self.generation, "Progress loop started");
    }

    /// Stop the timer; no-op when not running
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.generation += 1;
        self.scheduler.cancel();
        debug!("Progress loop stopped");
    }

    /// Evaluate one tick against the current status and seek state
    pub fn on_tick(
        &mut self,
        tick: Tick,
        status: PlaybackStatus,
        seek: &SeekCoordinator,
        engine: &dyn MediaEngine,
    ) -> TickOutcome {
        if !self.running || tick.generation != self.generation {
            debug!(generation = tick.generation, "Stale tick dropped");
            return TickOutcome::Ignored;
        }
        if status != PlaybackStatus::Playing {
            return TickOutcome::Ignored;
        }

        self.ticks += 1;

        if seek.is_seeking() {
            return TickOutcome::Suppressed;
        }

        let sample = ProgressSample::read(engine);
        TickOutcome::Progress {
            sample,
            end_of_stream: sample.duration > 0.0 && sample.progress >= self.end_threshold,
        }
    }
}

impl Drop for ProgressLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
