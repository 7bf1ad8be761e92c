use crate::config::ops_config::{FunctionConfig, MailboxConfig, OpsConfig, StorageConfig};
use crate::utils::error::{OpsError, Result};
use std::env;

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl OpsConfig {
    /// OPS_* 環境變數覆蓋檔案設定
    pub fn apply_env_overrides(&mut self) {
        if let Some(region) = var("OPS_REGION") {
            self.aws.region = Some(region);
        }
        if let Some(profile) = var("OPS_PROFILE") {
            self.aws.profile = Some(profile);
        }
        if let Some(name) = var("OPS_CONTACTS_TABLE") {
            self.tables.contacts.name = name;
        }
        if let Some(name) = var("OPS_RECIPIENTS_TABLE") {
            self.tables.recipients.name = name;
        }
        if let Some(name) = var("OPS_CAMPAIGNS_TABLE") {
            self.tables.campaigns.name = name;
        }
        if let Some(bucket) = var("OPS_BUCKET") {
            match &mut self.storage {
                Some(storage) => storage.bucket = bucket,
                None => {
                    self.storage = Some(StorageConfig {
                        bucket,
                        artifacts_bucket: None,
                        artifacts_prefix: None,
                    })
                }
            }
        }
        if let Some(name) = var("OPS_FUNCTION") {
            match &mut self.function {
                Some(function) => function.name = name,
                None => {
                    self.function = Some(FunctionConfig {
                        name,
                        source_dir: None,
                        exclude: Vec::new(),
                    })
                }
            }
        }
    }

    /// Builds the whole configuration from the environment (Lambda runtime, no file).
    pub fn from_env() -> Result<Self> {
        let mut config = OpsConfig::default();
        config.apply_env_overrides();

        let host = var("OPS_MAILBOX_HOST");
        if let Some(host) = host {
            let port = match var("OPS_MAILBOX_PORT") {
                Some(port) => port.parse().map_err(|_| OpsError::InvalidConfigValueError {
                    field: "OPS_MAILBOX_PORT".to_string(),
                    value: port.clone(),
                    reason: "Port must be a number".to_string(),
                })?,
                None => 993,
            };
            config.mailbox = Some(MailboxConfig {
                host,
                port,
                username: var("OPS_MAILBOX_USER").ok_or_else(|| OpsError::ConfigError {
                    message: "OPS_MAILBOX_USER environment variable is required".to_string(),
                })?,
                password: var("OPS_MAILBOX_PASSWORD").ok_or_else(|| OpsError::ConfigError {
                    message: "OPS_MAILBOX_PASSWORD environment variable is required".to_string(),
                })?,
                folder: var("OPS_MAILBOX_FOLDER").unwrap_or_else(|| "INBOX".to_string()),
            });
        }

        Ok(config)
    }
}
