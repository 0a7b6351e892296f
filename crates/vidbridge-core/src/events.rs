//! Host-facing player events
//!
//! Controllers push typed events onto an unbounded channel. The host
//! integration owns the receiving end and translates each event into its own
//! notification mechanism, usually via [`EventRecord`].

use crate::types::{InstanceId, PlaybackStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Sending half handed to every controller
pub type EventSink = mpsc::UnboundedSender<PlayerEvent>;

/// Receiving half owned by the host integration
pub type EventStream = mpsc::UnboundedReceiver<PlayerEvent>;

/// Create a connected sink/stream pair
pub fn event_channel() -> (EventSink, EventStream) {
    mpsc::unbounded_channel()
}

/// Events emitted by a player instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// A status transition was executed (also fired on re-entry)
    StatusChanged {
        instance: InstanceId,
        status: PlaybackStatus,
    },

    /// Periodic progress sample
    ProgressChanged {
        instance: InstanceId,
        progress: f64,
        duration: f64,
    },

    /// Engine reported new video dimensions
    VideoSizeChanged {
        instance: InstanceId,
        width: u32,
        height: u32,
    },
}

impl PlayerEvent {
    /// Instance that emitted the event
    pub fn instance(&self) -> InstanceId {
        match self {
            PlayerEvent::StatusChanged { instance, .. }
            | PlayerEvent::ProgressChanged { instance, .. }
            | PlayerEvent::VideoSizeChanged { instance, .. } => *instance,
        }
    }

    /// Host wire form of the event
    pub fn to_record(&self) -> EventRecord {
        match self {
            PlayerEvent::StatusChanged { instance, status } => EventRecord {
                name: EventRecord::STATUS_CHANGED,
                body: serde_json::json!({
                    "status": status.code(),
                    "instance": instance.0,
                }),
            },
            PlayerEvent::ProgressChanged {
                instance,
                progress,
                duration,
            } => EventRecord {
                name: EventRecord::PROGRESS_CHANGED,
                body: serde_json::json!({
                    "progress": progress,
                    "duration": duration,
                    "instance": instance.0,
                }),
            },
            PlayerEvent::VideoSizeChanged {
                instance,
                width,
                height,
            } => EventRecord {
                name: EventRecord::VIDEO_SIZE_CHANGED,
                body: serde_json::json!({
                    "width": width,
                    "height": height,
                    "instance": instance.0,
                }),
            },
        }
    }
}

/// Named event with a JSON body, as delivered to the host application
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub name: &'static str,
    pub body: serde_json::Value,
}

impl EventRecord {
    pub const STATUS_CHANGED: &'static str = "PlayerStatusChanged";
    pub const PROGRESS_CHANGED: &'static str = "PlayerProgressChanged";
    pub const VIDEO_SIZE_CHANGED: &'static str = "PlayerVideoSizeChanged";

    /// Event names the host must register for
    pub fn supported_events() -> [&'static str; 3] {
        [
            Self::STATUS_CHANGED,
            Self::PROGRESS_CHANGED,
            Self::VIDEO_SIZE_CHANGED,
        ]
    }
}
