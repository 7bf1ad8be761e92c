use crate::core::{collect_pages, LogSource};
use crate::domain::model::LogEvent;
use crate::utils::error::{OpsError, Result};
use chrono::{DateTime, Duration, Utc};

/// `30s`、`15m`、`2h`、`1d` 形式的時間窗
pub fn parse_window(window: &str) -> Result<Duration> {
    let invalid = |reason: &str| OpsError::InvalidConfigValueError {
        field: "since".to_string(),
        value: window.to_string(),
        reason: reason.to_string(),
    };

    let window = window.trim();
    let split = window
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| invalid("Missing unit (s, m, h or d)"))?;
    let (amount, unit) = window.split_at(split);
    let amount: i64 = amount
        .parse()
        .map_err(|_| invalid("Expected a number followed by a unit"))?;

    let duration = match unit {
        "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        _ => return Err(invalid("Unit must be one of s, m, h, d")),
    };
    duration.ok_or_else(|| invalid("Window is too large"))
}

/// Filtered events of `group` in the window ending at `now`, oldest first.
pub async fn tail<L: LogSource>(
    source: &L,
    group: &str,
    window: Duration,
    pattern: Option<&str>,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<Vec<LogEvent>> {
    let start_ms = now
        .checked_sub_signed(window)
        .ok_or_else(|| OpsError::InvalidConfigValueError {
            field: "since".to_string(),
            value: window.to_string(),
            reason: "Window reaches before the earliest representable time".to_string(),
        })?
        .timestamp_millis();
    tracing::debug!("Fetching {} from {} ms", group, start_ms);

    let mut events = collect_pages(Some(limit), move |token| {
        source.filter_page(group, start_ms, pattern, token)
    })
    .await?;
    events.sort_by_key(|e| e.timestamp_ms);
    Ok(events)
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}
