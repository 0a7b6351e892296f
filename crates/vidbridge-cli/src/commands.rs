//! CLI command implementations

use crate::output::{format_event, format_output, styled_status, OutputFormat};
use console::style;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use vidbridge_core::{
    event_channel, Bridge, EventRecord, LoadConfig, PlaybackStatus, PlayerConfig, PlayerEvent,
    SimulatedEngineFactory,
};

/// What the simulate command should do
#[derive(Debug, Clone)]
pub struct SimulateScript {
    pub url: String,
    pub duration: f64,
    pub looping: bool,
    pub autoplay: bool,
    pub silent: bool,
    /// (fraction, seconds after load)
    pub seek: Option<(f64, f64)>,
    pub stop_at: Option<f64>,
    pub timeout: f64,
}

fn after(seconds: f64) -> Instant {
    Instant::now() + Duration::from_secs_f64(seconds.max(0.0))
}

/// Play a URL on the simulated engine, printing every host event
pub async fn simulate(
    script: SimulateScript,
    config: PlayerConfig,
    format: &str,
) -> anyhow::Result<()> {
    let format = OutputFormat::from(format);
    if !(script.duration.is_finite() && script.duration > 0.0) {
        anyhow::bail!("duration must be a positive number of seconds");
    }

    if format == OutputFormat::Text {
        println!("Simulating: {}", script.url);
        println!("  Duration: {:.1}s", script.duration);
        println!("  Loop: {}", script.looping);
        println!("  Autoplay: {}", script.autoplay);
        println!("  Tick: {}ms", config.progress_interval_ms);
        println!();
    }

    let (tx, mut events) = event_channel();
    let bridge = Bridge::new(
        config,
        Arc::new(SimulatedEngineFactory::new(Some(script.duration))),
        tx,
    );

    let handle = bridge.new_instance().await;
    bridge.set_autoplay(handle, script.autoplay).await;
    bridge
        .load_with(
            handle,
            LoadConfig::detect(&script.url)
                .with_loop(script.looping)
                .with_silent(script.silent),
        )
        .await;

    let deadline = tokio::time::sleep_until(after(script.timeout));
    tokio::pin!(deadline);

    let mut pending_seek = script.seek;
    let seek_timer = tokio::time::sleep_until(after(pending_seek.map_or(0.0, |(_, at)| at)));
    tokio::pin!(seek_timer);

    let mut pending_stop = script.stop_at.is_some();
    let stop_timer = tokio::time::sleep_until(after(script.stop_at.unwrap_or(0.0)));
    tokio::pin!(stop_timer);

    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut last_status = PlaybackStatus::None;

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                *counts.entry(event.to_record().name).or_default() += 1;
                println!("{}", format_event(&event, format)?);

                if let PlayerEvent::StatusChanged { status, .. } = event {
                    last_status = status;
                    if matches!(status, PlaybackStatus::Finished | PlaybackStatus::Error | PlaybackStatus::Stopped) {
                        break;
                    }
                }
            }
            _ = &mut seek_timer, if pending_seek.is_some() => {
                if let Some((fraction, _)) = pending_seek.take() {
                    tracing::info!(fraction, "Scripted seek");
                    bridge.seek(handle, fraction).await;
                }
            }
            _ = &mut stop_timer, if pending_stop => {
                pending_stop = false;
                tracing::info!("Scripted stop");
                bridge.stop(handle).await;
            }
            _ = &mut deadline => {
                tracing::warn!(timeout = script.timeout, "Simulation timed out");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    let snapshot = bridge.snapshot(handle).await?;
    bridge.clear().await;

    match format {
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "final": snapshot,
                "events": counts,
            });
            println!("{}", format_output(&summary, format)?);
        }
        OutputFormat::Text => {
            println!();
            println!("Simulation complete:");
            println!("  Status: {}", styled_status(last_status));
            println!(
                "  Position: {:.1}s / {:.1}s",
                snapshot.position, snapshot.duration
            );
            for (name, count) in &counts {
                println!("  {}: {}", name, count);
            }
        }
    }

    if last_status == PlaybackStatus::Error {
        anyhow::bail!("playback ended in error");
    }

    Ok(())
}

/// Print the effective configuration
pub fn show_config(config: &PlayerConfig, format: &str) -> anyhow::Result<()> {
    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", format_output(config, OutputFormat::Json)?),
        OutputFormat::Text => {
            println!("Player configuration:");
            println!("  Progress interval: {}ms", config.progress_interval_ms);
            println!("  End threshold: {}", config.end_threshold);
            println!("  Default autoplay: {}", config.default_autoplay);
            println!("  Default volume: {}", config.default_volume);
        }
    }
    Ok(())
}

/// Print the event names and status codes a host registers for
pub fn list_events(format: &str) -> anyhow::Result<()> {
    let statuses = [
        PlaybackStatus::New,
        PlaybackStatus::Loading,
        PlaybackStatus::Playing,
        PlaybackStatus::Paused,
        PlaybackStatus::Error,
        PlaybackStatus::Stopped,
        PlaybackStatus::None,
        PlaybackStatus::Finished,
    ];

    match OutputFormat::from(format) {
        OutputFormat::Json => {
            let codes: BTreeMap<&str, u8> = statuses.iter().map(|s| (s.name(), s.code())).collect();
            let catalogue = serde_json::json!({
                "events": EventRecord::supported_events(),
                "statusCodes": codes,
            });
            println!("{}", format_output(&catalogue, OutputFormat::Json)?);
        }
        OutputFormat::Text => {
            println!("Events:");
            for name in EventRecord::supported_events() {
                println!("  {}", style(name).bold());
            }
            println!("\nStatus codes:");
            for status in statuses {
                println!("  {:>2}  {}", status.code(), styled_status(status));
            }
        }
    }
    Ok(())
}
