use crate::config::ops_config::MailboxConfig;
use crate::domain::model::RawMessage;
use crate::domain::ports::Mailbox;
use crate::utils::error::{OpsError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

/// IMAP over TLS. The client is blocking, so every fetch runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct ImapMailbox {
    config: MailboxConfig,
}

impl ImapMailbox {
    pub fn new(config: MailboxConfig) -> Self {
        Self { config }
    }
}

fn mailbox_error(context: &str, err: impl std::fmt::Display) -> OpsError {
    OpsError::MailboxError {
        message: format!("{}: {}", context, err),
    }
}

/// IMAP SEARCH 查詢字串，例如 `SINCE 01-Mar-2024`
pub fn search_query(since: Option<NaiveDate>) -> String {
    match since {
        Some(date) => format!("SINCE {}", date.format("%d-%b-%Y")),
        None => "ALL".to_string(),
    }
}

fn fetch_blocking(
    config: &MailboxConfig,
    folder: &str,
    since: Option<NaiveDate>,
) -> Result<Vec<RawMessage>> {
    let tls = native_tls::TlsConnector::builder()
        .build()
        .map_err(|e| mailbox_error("TLS setup failed", e))?;

    tracing::debug!("Connecting to {}:{}", config.host, config.port);
    let client = imap::connect((config.host.as_str(), config.port), &config.host, &tls)
        .map_err(|e| mailbox_error("connect failed", e))?;

    let mut session = client
        .login(&config.username, &config.password)
        .map_err(|(e, _)| mailbox_error("login failed", e))?;

    session
        .select(folder)
        .map_err(|e| mailbox_error("select failed", e))?;

    let mut sequence: Vec<u32> = session
        .search(search_query(since))
        .map_err(|e| mailbox_error("search failed", e))?
        .into_iter()
        .collect();
    sequence.sort_unstable();

    let mut messages = Vec::with_capacity(sequence.len());
    if !sequence.is_empty() {
        let set = sequence
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        // BODY.PEEK 不會把郵件標記為已讀
        let fetched = session
            .fetch(set, "(UID BODY.PEEK[])")
            .map_err(|e| mailbox_error("fetch failed", e))?;
        for fetch in fetched.iter() {
            if let Some(body) = fetch.body() {
                messages.push(RawMessage {
                    uid: fetch.uid,
                    body: body.to_vec(),
                });
            }
        }
    }

    if let Err(e) = session.logout() {
        tracing::warn!("IMAP logout failed: {}", e);
    }

    Ok(messages)
}

#[async_trait]
impl Mailbox for ImapMailbox {
    async fn fetch_messages(
        &self,
        folder: &str,
        since: Option<NaiveDate>,
    ) -> Result<Vec<RawMessage>> {
        let config = self.config.clone();
        let folder = folder.to_string();
        tokio::task::spawn_blocking(move || fetch_blocking(&config, &folder, since))
            .await
            .map_err(|e| mailbox_error("mailbox task failed", e))?
    }
}
