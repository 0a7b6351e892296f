//! VidBridge Core - Playback state machine for native video player bridges
//!
//! This crate provides the platform-independent half of a mobile video
//! player module:
//! - Playback status machine with host notification
//! - Buffering detection from engine signals
//! - Seek serialization with resume intent
//! - Periodic progress reporting and end-of-stream detection
//! - A registry of player instances addressed by integer index
//!
//! The decoder itself is abstracted behind [`MediaEngine`]; a
//! [`SimulatedEngine`] ships for tests and the CLI.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Bridge (registry)                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  host commands ──► PlayerHandle ──► input queue ──► player task │
//! │                                             │                   │
//! │                                   ┌─────────┴─────────┐         │
//! │                                   │    Playback       │         │
//! │                                   │    Controller     │         │
//! │                                   └─────────┬─────────┘         │
//! │                                             │                   │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────┴───────┐           │
//! │  │    Status    │  │  Buffering   │  │     Seek     │           │
//! │  │   Machine    │  │   Monitor    │  │ Coordinator  │           │
//! │  └──────┬───────┘  └──────────────┘  └──────────────┘           │
//! │         │                                                       │
//! │         │          ┌──────────────┐  ┌──────────────┐           │
//! │         │          │   Progress   │  │ MediaEngine  │           │
//! │         │          │     Loop     │  │  (platform)  │           │
//! │         │          └──────┬───────┘  └──────────────┘           │
//! │         └─────────────────┴──────► PlayerEvent stream ──► host  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Engine notifications and progress ticks share the instance's input queue
//! with host commands, so the controller sees all three in receipt order.

pub mod error;
pub mod types;
pub mod events;
pub mod engine;
pub mod status;
pub mod buffering;
pub mod seek;
pub mod progress;
pub mod controller;
pub mod player;
pub mod registry;

pub use error::{Error, Result};
pub use types::*;
pub use events::{event_channel, EventRecord, EventSink, EventStream, PlayerEvent};
pub use engine::{
    EngineEvent, EngineEventSender, EngineFactory, MediaEngine, SimulatedEngine,
    SimulatedEngineFactory,
};
pub use status::StatusMachine;
pub use buffering::BufferingMonitor;
pub use seek::SeekCoordinator;
pub use progress::{ManualTickScheduler, ProgressLoop, TickScheduler, TokioTickScheduler};
pub use controller::{PlaybackController, PlayerSnapshot};
pub use player::{Command, Input, PlayerHandle};
pub use registry::Bridge;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log library startup
pub fn init() {
    tracing::info!(version = VERSION, "VidBridge Core initialized");
}
