//! Instance registry and host command surface
//!
//! The host addresses players by integer index. [`Bridge`] hands out those
//! indices, spawns one player task per instance and routes commands to it.
//! Commands addressed to an unknown index are ignored, matching what host
//! applications expect from the native modules; [`Bridge::player`] offers a
//! strict lookup for callers that want the error.

use crate::{
    controller::PlayerSnapshot,
    engine::EngineFactory,
    events::EventSink,
    player::PlayerHandle,
    Error, InstanceId, LoadConfig, PlaybackStatus, PlayerConfig, Result,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Registry of player instances shared with the host integration
#[derive(Clone)]
pub struct Bridge {
    players: Arc<RwLock<Vec<PlayerHandle>>>,
    factory: Arc<dyn EngineFactory>,
    config: PlayerConfig,
    events: EventSink,
}

impl Bridge {
    /// Create an empty registry. Every instance gets its engine from
    /// `factory` and publishes on `events`.
    pub fn new(config: PlayerConfig, factory: Arc<dyn EngineFactory>, events: EventSink) -> Self {
        Self {
            players: Arc::new(RwLock::new(Vec::new())),
            factory,
            config,
            events,
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Number of live instances
    pub async fn len(&self) -> usize {
        self.players.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.players.read().await.is_empty()
    }

    /// Create an instance and return its index
    #[instrument(skip(self))]
    pub async fn new_instance(&self) -> usize {
        let mut players = self.players.write().await;
        let index = players.len();
        let (handle, _task) = PlayerHandle::spawn(
            InstanceId(index),
            &self.config,
            self.factory.as_ref(),
            self.events.clone(),
        );
        players.push(handle);
        info!(instance = index, "Instance created");
        index
    }

    /// Strict lookup
    pub async fn player(&self, handle: usize) -> Result<PlayerHandle> {
        let players = self.players.read().await;
        players.get(handle).cloned().ok_or(Error::InvalidHandle {
            handle,
            len: players.len(),
        })
    }

    /// Run `command` against the instance, ignoring unknown indices
    async fn with_player<F>(&self, handle: usize, command: &'static str, f: F)
    where
        F: FnOnce(&PlayerHandle) -> Result<()>,
    {
        match self.player(handle).await {
            Ok(player) => {
                if let Err(err) = f(&player) {
                    warn!(instance = handle, command, error = %err, "Command not delivered");
                }
            }
            Err(err) => debug!(command, error = %err, "Command ignored"),
        }
    }

    /// Load a media item into an instance
    #[instrument(skip(self))]
    pub async fn load(&self, handle: usize, url: &str, is_hls: bool, looping: bool, silent: bool) {
        let config = LoadConfig::new(url, is_hls)
            .with_loop(looping)
            .with_silent(silent);
        self.load_with(handle, config).await;
    }

    /// Load with a full configuration
    pub async fn load_with(&self, handle: usize, config: LoadConfig) {
        self.with_player(handle, "load", |p| p.load(config)).await;
    }

    pub async fn play(&self, handle: usize) {
        self.with_player(handle, "play", PlayerHandle::play).await;
    }

    pub async fn pause(&self, handle: usize) {
        self.with_player(handle, "pause", PlayerHandle::pause).await;
    }

    pub async fn stop(&self, handle: usize) {
        self.with_player(handle, "stop", PlayerHandle::stop).await;
    }

    /// Seek to a fraction in [0, 1]
    pub async fn seek(&self, handle: usize, fraction: f64) {
        self.with_player(handle, "seek", |p| p.seek(fraction)).await;
    }

    pub async fn seek_forward(&self, handle: usize, seconds: f64) {
        self.with_player(handle, "seek_forward", |p| p.seek_forward(seconds))
            .await;
    }

    pub async fn seek_rewind(&self, handle: usize, seconds: f64) {
        self.with_player(handle, "seek_rewind", |p| p.seek_rewind(seconds))
            .await;
    }

    pub async fn set_volume(&self, handle: usize, volume: f32) {
        self.with_player(handle, "set_volume", |p| p.set_volume(volume))
            .await;
    }

    pub async fn set_muted(&self, handle: usize, muted: bool) {
        self.with_player(handle, "set_muted", |p| p.set_muted(muted))
            .await;
    }

    pub async fn set_loop(&self, handle: usize, looping: bool) {
        self.with_player(handle, "set_loop", |p| p.set_loop(looping))
            .await;
    }

    pub async fn set_autoplay(&self, handle: usize, autoplay: bool) {
        self.with_player(handle, "set_autoplay", |p| p.set_autoplay(autoplay))
            .await;
    }

    /// Full state of an instance
    pub async fn snapshot(&self, handle: usize) -> Result<PlayerSnapshot> {
        self.player(handle).await?.snapshot().await
    }

    /// Duration in seconds; 0 when unknown or the index is invalid
    pub async fn duration(&self, handle: usize) -> f64 {
        self.snapshot(handle)
            .await
            .map(|s| s.duration)
            .unwrap_or(0.0)
    }

    /// Current status, `None` for an invalid index
    pub async fn status(&self, handle: usize) -> PlaybackStatus {
        self.snapshot(handle)
            .await
            .map(|s| s.status)
            .unwrap_or_default()
    }

    /// Release every instance and empty the registry
    #[instrument(skip(self))]
    pub async fn clear(&self) {
        let players = std::mem::take(&mut *self.players.write().await);
        let count = players.len();
        for player in players {
            if let Err(err) = player.release().await {
                debug!(instance = %player.instance(), error = %err, "Instance already gone");
            }
        }
        info!(count, "Registry cleared");
    }
}
