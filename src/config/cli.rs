use crate::config::OpsConfig;
use crate::core::report::OutputFormat;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "campaign-ops")]
#[command(about = "Inspect, fix and redeploy the email-campaign stack")]
pub struct Cli {
    /// Path to TOML configuration file (defaults to ./campaign-ops.toml when present)
    #[arg(short, long, global = true, env = "OPS_CONFIG")]
    pub config: Option<String>,

    /// Override the AWS region
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Use a named AWS profile
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Output format for listings
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// 命令列參數優先於檔案與環境變數
    pub fn apply_overrides(&self, config: &mut OpsConfig) {
        if let Some(region) = &self.region {
            config.aws.region = Some(region.clone());
        }
        if let Some(profile) = &self.profile {
            config.aws.profile = Some(profile.clone());
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Campaign records and their recipients
    #[command(subcommand)]
    Campaigns(CampaignsCommand),
    /// Contact records
    #[command(subcommand)]
    Contacts(ContactsCommand),
    /// Objects in the assets bucket
    #[command(subcommand)]
    Objects(ObjectsCommand),
    /// Lambda function configuration, invocation and code deployment
    #[command(subcommand)]
    Function(FunctionCommand),
    /// API Gateway resources
    #[command(subcommand)]
    Gateway(GatewayCommand),
    /// CloudWatch log events
    #[command(subcommand)]
    Logs(LogsCommand),
    /// Cognito users
    #[command(subcommand)]
    Users(UsersCommand),
    /// Bounce mailbox inspection
    #[command(subcommand)]
    Bounces(BouncesCommand),
}

/// Flags shared by every destructive command.
#[derive(Debug, Clone, Copy, Args)]
pub struct Confirm {
    /// Only count what would change
    #[arg(long)]
    pub dry_run: bool,

    /// Confirm the mutation
    #[arg(long)]
    pub yes: bool,
}

#[derive(Debug, Subcommand)]
pub enum CampaignsCommand {
    List {
        #[arg(long)]
        status: Option<String>,
    },
    Show {
        campaign_id: String,
    },
    /// Recipient counts per delivery status
    Stats {
        campaign_id: String,
    },
    /// Failed and bounced recipients with their error message
    Failures {
        campaign_id: String,
    },
    SetStatus {
        campaign_id: String,
        status: String,
    },
    /// Put failed recipients back to pending
    ResetFailed {
        campaign_id: String,
        #[command(flatten)]
        confirm: Confirm,
    },
}

#[derive(Debug, Subcommand)]
pub enum ContactsCommand {
    List,
    Add {
        email: String,
        #[arg(long)]
        name: Option<String>,
    },
    Delete {
        email: String,
    },
    /// Delete every contact
    Purge {
        #[command(flatten)]
        confirm: Confirm,
    },
}

#[derive(Debug, Subcommand)]
pub enum ObjectsCommand {
    List {
        #[arg(long)]
        prefix: Option<String>,
        /// Bucket other than the configured one
        #[arg(long)]
        bucket: Option<String>,
    },
    /// Download one object to a file, or stdout when no file is given
    Get {
        key: String,
        #[arg(long)]
        out: Option<String>,
        #[arg(long)]
        bucket: Option<String>,
    },
    Delete {
        key: String,
        #[arg(long)]
        bucket: Option<String>,
    },
    /// Delete every object under a prefix
    Purge {
        prefix: String,
        #[arg(long)]
        bucket: Option<String>,
        #[command(flatten)]
        confirm: Confirm,
    },
}

#[derive(Debug, Subcommand)]
pub enum FunctionCommand {
    List,
    Show {
        /// Function name (defaults to function.name)
        #[arg(long)]
        name: Option<String>,
    },
    Invoke {
        #[arg(long)]
        name: Option<String>,
        /// JSON payload
        #[arg(long, default_value = "{}")]
        payload: String,
    },
    /// Zip the source directory into a local file
    Package {
        #[arg(long)]
        source: Option<String>,
        #[arg(long, default_value = "./dist")]
        out: String,
    },
    /// Zip the source directory and upload it as the function code
    Deploy {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        source: Option<String>,
        /// Stage the archive in the artifacts bucket first
        #[arg(long)]
        via_s3: bool,
        /// Return as soon as the upload is accepted
        #[arg(long)]
        no_wait: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum GatewayCommand {
    Apis,
    Resources {
        #[arg(long)]
        api: Option<String>,
    },
    Stages {
        #[arg(long)]
        api: Option<String>,
    },
    Integration {
        resource_id: String,
        method: String,
        #[arg(long)]
        api: Option<String>,
    },
    /// GET a deployed stage URL
    Ping {
        url: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum LogsCommand {
    Tail {
        #[arg(long)]
        group: Option<String>,
        /// Relative window: 30s, 15m, 2h, 1d
        #[arg(long, default_value = "15m")]
        since: String,
        /// CloudWatch filter pattern
        #[arg(long)]
        filter: Option<String>,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    List {
        #[arg(long)]
        pool: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum BouncesCommand {
    /// Parse bounce notifications and optionally mark the addresses
    Scan {
        /// Only messages since this date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,
        #[arg(long)]
        folder: Option<String>,
        /// Write `bounced` to matching contacts and recipients
        #[arg(long)]
        apply: bool,
        #[command(flatten)]
        confirm: Confirm,
    },
}
