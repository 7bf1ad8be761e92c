use crate::domain::model::{LogEvent, Page};
use crate::domain::ports::LogSource;
use crate::utils::error::{OpsError, Result};
use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::Client as LogsClient;

#[derive(Debug, Clone)]
pub struct CloudWatchLogs {
    client: LogsClient,
}

impl CloudWatchLogs {
    pub fn new(client: LogsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogSource for CloudWatchLogs {
    async fn filter_page(
        &self,
        group: &str,
        start_ms: i64,
        pattern: Option<&str>,
        token: Option<String>,
    ) -> Result<Page<LogEvent, String>> {
        let output = self
            .client
            .filter_log_events()
            .log_group_name(group)
            .start_time(start_ms)
            .set_filter_pattern(pattern.map(str::to_string))
            .set_next_token(token)
            .send()
            .await
            .map_err(|e| OpsError::service("logs", "filter_log_events", e))?;

        let items = output
            .events()
            .iter()
            .map(|event| LogEvent {
                timestamp_ms: event.timestamp().unwrap_or(0),
                stream: event.log_stream_name().unwrap_or_default().to_string(),
                message: event.message().unwrap_or_default().trim_end().to_string(),
            })
            .collect();

        Ok(Page {
            items,
            next: output.next_token().map(str::to_string),
        })
    }
}
