use crate::utils::error::{OpsError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "campaign-ops.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpsConfig {
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub tables: TablesConfig,
    pub storage: Option<StorageConfig>,
    pub function: Option<FunctionConfig>,
    pub gateway: Option<GatewayConfig>,
    pub logs: Option<LogsConfig>,
    pub identity: Option<IdentityConfig>,
    pub mailbox: Option<MailboxConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: Option<String>,
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,
    pub key: Vec<String>,
}

impl TableConfig {
    fn new(name: &str, key: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            key: key.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    #[serde(default = "default_campaigns_table")]
    pub campaigns: TableConfig,
    #[serde(default = "default_recipients_table")]
    pub recipients: TableConfig,
    #[serde(default = "default_contacts_table")]
    pub contacts: TableConfig,
}

fn default_campaigns_table() -> TableConfig {
    TableConfig::new("Campaigns", &["campaign_id"])
}

fn default_recipients_table() -> TableConfig {
    TableConfig::new("CampaignRecipients", &["campaign_id", "email"])
}

fn default_contacts_table() -> TableConfig {
    TableConfig::new("Contacts", &["email"])
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            campaigns: default_campaigns_table(),
            recipients: default_recipients_table(),
            contacts: default_contacts_table(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub artifacts_bucket: Option<String>,
    pub artifacts_prefix: Option<String>,
}

impl StorageConfig {
    pub fn artifacts_bucket(&self) -> &str {
        self.artifacts_bucket.as_deref().unwrap_or(&self.bucket)
    }

    pub fn artifacts_prefix(&self) -> &str {
        self.artifacts_prefix.as_deref().unwrap_or("deploy")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionConfig {
    pub name: String,
    pub source_dir: Option<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub api_id: Option<String>,
    pub stage_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    pub group: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub user_pool_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxConfig {
    pub host: String,
    #[serde(default = "default_imap_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default = "default_folder")]
    pub folder: String,
}

fn default_imap_port() -> u16 {
    993
}

fn default_folder() -> String {
    "INBOX".to_string()
}

impl OpsConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(OpsError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| OpsError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Loads the file when it exists, otherwise starts from defaults. Explicit paths must exist.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => {
                tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// 替換環境變數 (例如 ${BOUNCE_PASSWORD})，未定義的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| OpsError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn storage(&self) -> Result<&StorageConfig> {
        validation::validate_required_field("storage", &self.storage)
    }

    pub fn function(&self) -> Result<&FunctionConfig> {
        validation::validate_required_field("function", &self.function)
    }

    pub fn gateway(&self) -> Result<&GatewayConfig> {
        validation::validate_required_field("gateway", &self.gateway)
    }

    pub fn logs(&self) -> Result<&LogsConfig> {
        validation::validate_required_field("logs", &self.logs)
    }

    pub fn identity(&self) -> Result<&IdentityConfig> {
        validation::validate_required_field("identity", &self.identity)
    }

    pub fn mailbox(&self) -> Result<&MailboxConfig> {
        validation::validate_required_field("mailbox", &self.mailbox)
    }

    fn validate_table(field: &str, table: &TableConfig) -> Result<()> {
        validation::validate_non_empty_string(&format!("{}.name", field), &table.name)?;
        if table.key.is_empty() || table.key.len() > 2 {
            return Err(OpsError::InvalidConfigValueError {
                field: format!("{}.key", field),
                value: table.key.join(","),
                reason: "A table key has one (partition) or two (partition, sort) attributes"
                    .to_string(),
            });
        }
        Ok(())
    }
}

impl Validate for OpsConfig {
    fn validate(&self) -> Result<()> {
        if let Some(region) = &self.aws.region {
            validation::validate_aws_region("aws.region", region)?;
        }

        Self::validate_table("tables.campaigns", &self.tables.campaigns)?;
        Self::validate_table("tables.recipients", &self.tables.recipients)?;
        Self::validate_table("tables.contacts", &self.tables.contacts)?;

        if let Some(storage) = &self.storage {
            validation::validate_s3_bucket_name("storage.bucket", &storage.bucket)?;
            if let Some(bucket) = &storage.artifacts_bucket {
                validation::validate_s3_bucket_name("storage.artifacts_bucket", bucket)?;
            }
        }

        if let Some(function) = &self.function {
            validation::validate_non_empty_string("function.name", &function.name)?;
            if let Some(dir) = &function.source_dir {
                validation::validate_path("function.source_dir", dir)?;
            }
        }

        if let Some(url) = self.gateway.as_ref().and_then(|g| g.stage_url.as_ref()) {
            validation::validate_url("gateway.stage_url", url)?;
        }

        if let Some(mailbox) = &self.mailbox {
            validation::validate_non_empty_string("mailbox.host", &mailbox.host)?;
            validation::validate_range("mailbox.port", mailbox.port, 1, u16::MAX)?;
            validation::validate_non_empty_string("mailbox.username", &mailbox.username)?;
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[aws]
region = "eu-west-1"

[tables.contacts]
name = "ProdContacts"
key = ["email"]

[storage]
bucket = "campaign-assets"
artifacts_prefix = "lambda"

[function]
name = "campaign-sender"
source_dir = "./sender"

[mailbox]
host = "imap.example.com"
username = "bounces@example.com"
password = "secret"
"#;

        let config = OpsConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.aws.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.tables.contacts.name, "ProdContacts");
        // 未設定的資料表使用預設值
        assert_eq!(config.tables.recipients.key, vec!["campaign_id", "email"]);
        assert_eq!(config.storage().unwrap().artifacts_bucket(), "campaign-assets");
        assert_eq!(config.mailbox().unwrap().port, 993);
        assert_eq!(config.mailbox().unwrap().folder, "INBOX");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("OPS_TEST_MAILBOX_PASSWORD", "from-env");

        let toml_content = r#"
[mailbox]
host = "imap.example.com"
username = "bounces"
password = "${OPS_TEST_MAILBOX_PASSWORD}"
folder = "${OPS_TEST_UNDEFINED_FOLDER}"
"#;

        let config = OpsConfig::from_toml_str(toml_content).unwrap();
        let mailbox = config.mailbox().unwrap();
        assert_eq!(mailbox.password, "from-env");
        assert_eq!(mailbox.folder, "${OPS_TEST_UNDEFINED_FOLDER}");

        std::env::remove_var("OPS_TEST_MAILBOX_PASSWORD");
    }

    #[test]
    fn test_missing_section_is_reported() {
        let config = OpsConfig::from_toml_str("").unwrap();
        let err = config.storage().unwrap_err();
        assert!(matches!(err, OpsError::MissingConfigError { ref field } if field == "storage"));
    }

    #[test]
    fn test_config_validation() {
        let config = OpsConfig::from_toml_str(
            r#"
[storage]
bucket = "Not_A_Bucket"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = OpsConfig::from_toml_str(
            r#"
[tables.contacts]
name = "Contacts"
key = []
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[logs]\ngroup = \"/aws/lambda/campaign-sender\"\n")
            .unwrap();

        let config = OpsConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.logs().unwrap().group, "/aws/lambda/campaign-sender");
    }
}
