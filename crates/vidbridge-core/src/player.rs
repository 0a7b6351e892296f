//! Player task
//!
//! Each instance runs as one tokio task that owns its [`PlaybackController`].
//! Host commands, engine notifications and progress ticks all land on a
//! single [`Input`] queue and are applied one at a time in receipt order, so
//! controller state is never touched concurrently.

use crate::{
    controller::{PlaybackController, PlayerSnapshot},
    engine::{EngineEvent, EngineEventSender, EngineFactory},
    events::EventSink,
    progress::{Tick, TickSender, TokioTickScheduler},
    Error, InstanceId, LoadConfig, PlayerConfig, Result, SessionId,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Host command for one instance
#[derive(Debug)]
pub enum Command {
    Load(LoadConfig),
    Play,
    Pause,
    Stop,
    Seek(f64),
    SeekForward(f64),
    SeekRewind(f64),
    SetVolume(f32),
    SetMuted(bool),
    SetLoop(bool),
    SetAutoplay(bool),
    Snapshot(oneshot::Sender<PlayerSnapshot>),
    /// Tear down and exit; acknowledged once released
    Release(oneshot::Sender<()>),
}

/// Everything a player task reacts to
#[derive(Debug)]
pub enum Input {
    Command(Command),
    /// Engine notification for the load identified by `session`
    Engine {
        session: SessionId,
        event: EngineEvent,
    },
    Tick(Tick),
}

pub type InputSender = mpsc::UnboundedSender<Input>;
pub type InputStream = mpsc::UnboundedReceiver<Input>;

/// Create a player input queue
pub fn inbox() -> (InputSender, InputStream) {
    mpsc::unbounded_channel()
}

/// Cloneable handle to a running player task
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    instance: InstanceId,
    inputs: InputSender,
}

impl PlayerHandle {
    /// Spawn a player task with a fresh engine from `factory`
    pub fn spawn(
        instance: InstanceId,
        config: &PlayerConfig,
        factory: &dyn EngineFactory,
        events: EventSink,
    ) -> (Self, JoinHandle<()>) {
        let (inputs, queue) = inbox();

        // Engine and timer hold weak senders: the queue closes with the last handle
        let controller = PlaybackController::new(
            instance,
            config,
            factory.create(EngineEventSender::new(&inputs)),
            Box::new(TokioTickScheduler::new(TickSender::new(&inputs))),
            events,
        );

        let task = tokio::spawn(run(controller, queue));
        debug!(instance = %instance, "Player task spawned");

        (Self { instance, inputs }, task)
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// True once the task has exited
    pub fn is_closed(&self) -> bool {
        self.inputs.is_closed()
    }

    /// Queue a command
    pub fn send(&self, command: Command) -> Result<()> {
        self.inputs
            .send(Input::Command(command))
            .map_err(|_| Error::PlayerClosed)
    }

    pub fn load(&self, config: LoadConfig) -> Result<()> {
        self.send(Command::Load(config))
    }

    pub fn play(&self) -> Result<()> {
        self.send(Command::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    pub fn seek(&self, fraction: f64) -> Result<()> {
        self.send(Command::Seek(fraction))
    }

    pub fn seek_forward(&self, seconds: f64) -> Result<()> {
        self.send(Command::SeekForward(seconds))
    }

    pub fn seek_rewind(&self, seconds: f64) -> Result<()> {
        self.send(Command::SeekRewind(seconds))
    }

    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.send(Command::SetVolume(volume))
    }

    pub fn set_muted(&self, muted: bool) -> Result<()> {
        self.send(Command::SetMuted(muted))
    }

    pub fn set_loop(&self, looping: bool) -> Result<()> {
        self.send(Command::SetLoop(looping))
    }

    pub fn set_autoplay(&self, autoplay: bool) -> Result<()> {
        self.send(Command::SetAutoplay(autoplay))
    }

    /// Current state, after every command queued before it has applied
    pub async fn snapshot(&self) -> Result<PlayerSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx))?;
        rx.await.map_err(|_| Error::PlayerClosed)
    }

    /// Release the instance and wait for the task to finish tearing down
    pub async fn release(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Release(tx))?;
        rx.await.map_err(|_| Error::PlayerClosed)
    }
}

async fn run(mut controller: PlaybackController, mut queue: InputStream) {
    let instance = controller.instance();

    loop {
        match queue.recv().await {
            Some(Input::Command(command)) => {
                if !apply(&mut controller, command) {
                    break;
                }
            }
            Some(Input::Engine { session, event }) => controller.on_engine_event(session, event),
            Some(Input::Tick(tick)) => controller.on_tick(tick),
            None => {
                debug!(instance = %instance, "All handles dropped");
                controller.release();
                break;
            }
        }
    }

    info!(instance = %instance, "Player task stopped");
}

/// Apply one command. Returns false once the task should exit.
fn apply(controller: &mut PlaybackController, command: Command) -> bool {
    match command {
        Command::Load(config) => {
            if let Err(err) = controller.load(config) {
                warn!(instance = %controller.instance(), error = %err, code = err.error_code(), "Load failed");
            }
        }
        Command::Play => controller.play(),
        Command::Pause => controller.pause(),
        Command::Stop => controller.stop(),
        Command::Seek(fraction) => controller.seek(fraction),
        Command::SeekForward(seconds) => controller.seek_forward(seconds),
        Command::SeekRewind(seconds) => controller.seek_rewind(seconds),
        Command::SetVolume(volume) => controller.set_volume(volume),
        Command::SetMuted(muted) => controller.set_muted(muted),
        Command::SetLoop(looping) => controller.set_loop(looping),
        Command::SetAutoplay(autoplay) => controller.set_autoplay(autoplay),
        Command::Snapshot(reply) => {
            if reply.send(controller.snapshot()).is_err() {
                debug!(instance = %controller.instance(), "Snapshot requester went away");
            }
        }
        Command::Release(ack) => {
            controller.release();
            if ack.send(()).is_err() {
                debug!(instance = %controller.instance(), "Release acknowledged to nobody");
            }
            return false;
        }
    }
    true
}
