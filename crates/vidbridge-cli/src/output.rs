//! Output formatting for CLI

use console::{style, StyledObject};
use serde::Serialize;
use vidbridge_core::{PlaybackStatus, PlayerEvent};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

/// Pretty JSON, or the compact form for text output
pub fn format_output<T: Serialize>(data: &T, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::Text => serde_json::to_string(data)?,
    })
}

/// Status label coloured by severity
pub fn styled_status(status: PlaybackStatus) -> StyledObject<&'static str> {
    let label = style(status.name());
    match status {
        PlaybackStatus::Playing => label.green().bold(),
        PlaybackStatus::Paused | PlaybackStatus::Loading | PlaybackStatus::New => label.yellow(),
        PlaybackStatus::Finished | PlaybackStatus::Stopped => label.cyan(),
        PlaybackStatus::Error => label.red().bold(),
        PlaybackStatus::None => label.dim(),
    }
}

/// One event line, timestamped with wall-clock time
pub fn format_event(event: &PlayerEvent, format: OutputFormat) -> anyhow::Result<String> {
    let now = chrono::Utc::now();

    if format == OutputFormat::Json {
        let record = event.to_record();
        let line = serde_json::json!({
            "timestamp": now.to_rfc3339(),
            "name": record.name,
            "body": record.body,
        });
        return Ok(serde_json::to_string(&line)?);
    }

    let stamp = style(now.format("%H:%M:%S%.3f")).dim();
    Ok(match event {
        PlayerEvent::StatusChanged { instance, status } => {
            format!("[{}] #{} status   {}", stamp, instance, styled_status(*status))
        }
        PlayerEvent::ProgressChanged {
            instance,
            progress,
            duration,
        } => format!(
            "[{}] #{} progress {:>5.1}% of {:.1}s",
            stamp,
            instance,
            progress * 100.0,
            duration
        ),
        PlayerEvent::VideoSizeChanged {
            instance,
            width,
            height,
        } => format!("[{}] #{} video    {}x{}", stamp, instance, width, height),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidbridge_core::InstanceId;

    #[test]
    fn test_format_parsing() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Text);
    }

    #[test]
    fn test_json_event_line() {
        let event = PlayerEvent::StatusChanged {
            instance: InstanceId(2),
            status: PlaybackStatus::Finished,
        };
        let line = format_event(&event, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["name"], "PlayerStatusChanged");
        assert_eq!(value["body"]["status"], 7);
        assert_eq!(value["body"]["instance"], 2);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_text_progress_line() {
        console::set_colors_enabled(false);
        let event = PlayerEvent::ProgressChanged {
            instance: InstanceId(0),
            progress: 0.5,
            duration: 8.0,
        };
        let line = format_event(&event, OutputFormat::Text).unwrap();
        assert!(line.ends_with("#0 progress  50.0% of 8.0s"));
    }
}
