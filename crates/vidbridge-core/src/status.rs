//! Status machine
//!
//! Holds the single authoritative [`PlaybackStatus`] of an instance. Every
//! accepted transition, re-entry included, is published exactly once on the
//! event sink; rejected transitions publish nothing.

use crate::{
    events::{EventSink, PlayerEvent},
    Error, InstanceId, PlaybackStatus, Result,
};
use tracing::{debug, info};

pub struct StatusMachine {
    instance: InstanceId,
    status: PlaybackStatus,
    events: EventSink,
    /// Accepted transitions, for diagnostics
    transitions: u64,
}

impl StatusMachine {
    pub fn new(instance: InstanceId, events: EventSink) -> Self {
        Self {
            instance,
            status: PlaybackStatus::None,
            events,
            transitions: 0,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Move to `target` and notify. Returns the previous status.
    pub fn transition(&mut self, target: PlaybackStatus) -> Result<PlaybackStatus> {
        let current = self.status;

        if !current.can_transition_to(target) {
            return Err(Error::InvalidStateTransition {
                from: current.to_string(),
                to: target.to_string(),
            });
        }

        self.status = target;
        self.transitions += 1;

        if current == target {
            debug!(instance = %self.instance, status = %target, "Status re-entered");
        } else {
            info!(instance = %self.instance, from = %current, to = %target, "Status transition");
        }

        let event = PlayerEvent::StatusChanged {
            instance: self.instance,
            status: target,
        };
        if self.events.send(event).is_err() {
            debug!(instance = %self.instance, "Status event dropped, no subscriber");
        }

        Ok(current)
    }

    /// Like [`transition`](Self::transition) but logs and drops invalid requests
    pub fn request(&mut self, target: PlaybackStatus) -> bool {
        match self.transition(target) {
            Ok(_) => true,
            Err(err) => {
                debug!(instance = %self.instance, error = %err, "Transition ignored");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{event_channel, EventStream};

    fn drain(rx: &mut EventStream) -> Vec<PlaybackStatus> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let PlayerEvent::StatusChanged { status, .. } = event {
                out.push(status);
            }
        }
        out
    }

    #[test]
    fn test_starts_idle() {
        let (tx, _rx) = event_channel();
        let machine = StatusMachine::new(InstanceId(0), tx);
        assert_eq!(machine.status(), PlaybackStatus::None);
    }

    #[test]
    fn test_each_transition_notifies_once() {
        let (tx, mut rx) = event_channel();
        let mut machine = StatusMachine::new(InstanceId(0), tx);

        machine.transition(PlaybackStatus::New).unwrap();
        machine.transition(PlaybackStatus::Playing).unwrap();
        machine.transition(PlaybackStatus::Paused).unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![
                PlaybackStatus::New,
                PlaybackStatus::Playing,
                PlaybackStatus::Paused
            ]
        );
        assert_eq!(machine.transitions(), 3);
    }

    #[test]
    fn test_reentry_still_notifies() {
        let (tx, mut rx) = event_channel();
        let mut machine = StatusMachine::new(InstanceId(0), tx);
        machine.transition(PlaybackStatus::New).unwrap();
        machine.transition(PlaybackStatus::Paused).unwrap();
        drain(&mut rx);

        assert_eq!(
            machine.transition(PlaybackStatus::Paused).unwrap(),
            PlaybackStatus::Paused
        );
        assert_eq!(drain(&mut rx), vec![PlaybackStatus::Paused]);
    }

    #[test]
    fn test_invalid_transition_is_silent() {
        let (tx, mut rx) = event_channel();
        let mut machine = StatusMachine::new(InstanceId(0), tx);

        let err = machine.transition(PlaybackStatus::Playing).unwrap_err();
        assert!(matches!(err, Error::InvalidStateTransition { .. }));
        assert!(!machine.request(PlaybackStatus::Finished));
        assert_eq!(machine.status(), PlaybackStatus::None);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_survives_dropped_subscriber() {
        let (tx, rx) = event_channel();
        drop(rx);
        let mut machine = StatusMachine::new(InstanceId(3), tx);
        assert!(machine.request(PlaybackStatus::New));
        assert_eq!(machine.status(), PlaybackStatus::New);
    }
}
