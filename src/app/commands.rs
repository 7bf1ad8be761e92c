use crate::adapters::local::LocalStorage;
use crate::adapters::mailbox::ImapMailbox;
use crate::adapters::AwsContext;
use crate::config::cli::{
    BouncesCommand, CampaignsCommand, Cli, Command, Confirm, ContactsCommand, FunctionCommand,
    GatewayCommand, LogsCommand, ObjectsCommand, UsersCommand,
};
use crate::config::ops_config::MailboxConfig;
use crate::config::OpsConfig;
use crate::core::deploy::{self, ArtifactTarget, DeployOptions};
use crate::core::logs::format_timestamp;
use crate::core::report::{bulk_summary, OutputFormat, Table};
use crate::core::{bounces, campaigns, contacts, functions, gateway, logs, objects, users};
use crate::domain::model::FunctionSummary;
use crate::utils::error::{OpsError, Result};
use std::io::Write;
use std::path::Path;

fn print_table(table: &Table, format: OutputFormat) -> Result<()> {
    println!("{}", table.render(format)?);
    Ok(())
}

fn opt(value: Option<impl ToString>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// 破壞性操作需要 --yes，或以 --dry-run 只計數
fn require_confirmation(confirm: Confirm, what: &str) -> Result<()> {
    if confirm.dry_run || confirm.yes {
        return Ok(());
    }
    Err(OpsError::ConfigError {
        message: format!("refusing to {} without --yes (or use --dry-run)", what),
    })
}

/// Confirmation comes before the mailbox is opened so a refused run fetches nothing.
fn bounce_mailbox(config: &OpsConfig, apply: bool, confirm: Confirm) -> Result<&MailboxConfig> {
    if apply {
        require_confirmation(confirm, "mark bounced addresses")?;
    }
    config.mailbox()
}

fn pick<'a>(explicit: &'a Option<String>, configured: Option<&'a str>, field: &str) -> Result<&'a str> {
    explicit
        .as_deref()
        .or(configured)
        .ok_or_else(|| OpsError::MissingConfigError {
            field: field.to_string(),
        })
}

pub async fn run(cli: Cli, config: OpsConfig) -> Result<()> {
    let format = cli.format;

    // 不需要 AWS 的指令
    match &cli.command {
        Command::Function(FunctionCommand::Package { source, out }) => {
            return package(&config, source, out).await;
        }
        Command::Gateway(GatewayCommand::Ping { url }) => {
            let configured = config.gateway.as_ref().and_then(|g| g.stage_url.as_deref());
            let url = pick(url, configured, "gateway.stage_url")?;
            let result = gateway::ping(&reqwest::Client::new(), url).await?;
            let mut table = Table::new(&["url", "status", "elapsed_ms", "bytes"]);
            table.push([
                result.url.clone(),
                result.status.to_string(),
                result.elapsed.as_millis().to_string(),
                result.body_bytes.to_string(),
            ]);
            return print_table(&table, format);
        }
        _ => {}
    }

    let aws = AwsContext::load(&config.aws).await;

    match cli.command {
        Command::Campaigns(command) => run_campaigns(&aws, &config, command, format).await,
        Command::Contacts(command) => run_contacts(&aws, &config, command, format).await,
        Command::Objects(command) => run_objects(&aws, &config, command, format).await,
        Command::Function(command) => run_function(&aws, &config, command, format).await,
        Command::Gateway(command) => run_gateway(&aws, &config, command, format).await,
        Command::Logs(command) => run_logs(&aws, &config, command, format).await,
        Command::Users(UsersCommand::List { pool }) => {
            let configured = config.identity.as_ref().map(|i| i.user_pool_id.as_str());
            let pool = pick(&pool, configured, "identity.user_pool_id")?;
            let users = users::list_users(&aws.cognito(), pool).await?;
            let mut table = Table::new(&["username", "email", "status", "enabled"]);
            for user in users {
                table.push([
                    user.username,
                    opt(user.email),
                    opt(user.status),
                    user.enabled.to_string(),
                ]);
            }
            print_table(&table, format)
        }
        Command::Bounces(command) => run_bounces(&aws, &config, command, format).await,
    }
}

async fn run_campaigns(
    aws: &AwsContext,
    config: &OpsConfig,
    command: CampaignsCommand,
    format: OutputFormat,
) -> Result<()> {
    let store = aws.dynamodb();
    let tables = &config.tables;

    match command {
        CampaignsCommand::List { status } => {
            let list = campaigns::list_campaigns(&store, &tables.campaigns, status.as_deref()).await?;
            let mut table = Table::new(&["campaign_id", "status", "created_at", "subject"]);
            for campaign in list {
                table.push([
                    campaign.campaign_id,
                    campaign.status.to_string(),
                    opt(campaign.created_at),
                    campaign.subject,
                ]);
            }
            print_table(&table, format)
        }
        CampaignsCommand::Show { campaign_id } => {
            let campaign = campaigns::show_campaign(&store, &tables.campaigns, &campaign_id).await?;
            let mut table = Table::new(&["field", "value"]);
            table.push(["campaign_id".to_string(), campaign.campaign_id]);
            table.push(["status".to_string(), campaign.status.to_string()]);
            table.push(["created_at".to_string(), opt(campaign.created_at)]);
            table.push(["subject".to_string(), campaign.subject]);
            table.push(["body".to_string(), campaign.body]);
            print_table(&table, format)
        }
        CampaignsCommand::Stats { campaign_id } => {
            let stats = campaigns::campaign_stats(&store, &tables.recipients, &campaign_id).await?;
            let mut table = Table::new(&["status", "recipients"]);
            for (status, count) in &stats.by_status {
                table.push([status.clone(), count.to_string()]);
            }
            table.push(["total".to_string(), stats.total.to_string()]);
            print_table(&table, format)
        }
        CampaignsCommand::Failures { campaign_id } => {
            let failures = campaigns::list_failures(&store, &tables.recipients, &campaign_id).await?;
            let mut table = Table::new(&["email", "status", "error_message"]);
            for recipient in failures {
                table.push([
                    recipient.email,
                    recipient.status.to_string(),
                    opt(recipient.error_message),
                ]);
            }
            print_table(&table, format)
        }
        CampaignsCommand::SetStatus {
            campaign_id,
            status,
        } => {
            let previous =
                campaigns::set_campaign_status(&store, &tables.campaigns, &campaign_id, &status)
                    .await?;
            println!("✅ {}: {} -> {}", campaign_id, previous, status);
            Ok(())
        }
        CampaignsCommand::ResetFailed {
            campaign_id,
            confirm,
        } => {
            require_confirmation(confirm, "reset failed recipients")?;
            let outcome =
                campaigns::reset_failed(&store, tables, &campaign_id, confirm.dry_run).await?;
            println!("{}", bulk_summary("reset to pending", &outcome));
            Ok(())
        }
    }
}

async fn run_contacts(
    aws: &AwsContext,
    config: &OpsConfig,
    command: ContactsCommand,
    format: OutputFormat,
) -> Result<()> {
    let store = aws.dynamodb();
    let table_config = &config.tables.contacts;

    match command {
        ContactsCommand::List => {
            let list = contacts::list_contacts(&store, table_config).await?;
            let mut table = Table::new(&["email", "name", "status"]);
            for contact in list {
                table.push([contact.email, opt(contact.name), opt(contact.status)]);
            }
            print_table(&table, format)
        }
        ContactsCommand::Add { email, name } => {
            contacts::add_contact(&store, table_config, &email, name.as_deref()).await?;
            println!("✅ Added {}", email);
            Ok(())
        }
        ContactsCommand::Delete { email } => {
            contacts::delete_contact(&store, table_config, &email).await?;
            println!("✅ Deleted {}", email);
            Ok(())
        }
        ContactsCommand::Purge { confirm } => {
            require_confirmation(confirm, &format!("delete every item in {}", table_config.name))?;
            let outcome = contacts::purge_contacts(&store, table_config, confirm.dry_run).await?;
            println!("{}", bulk_summary("deleted", &outcome));
            Ok(())
        }
    }
}

async fn run_objects(
    aws: &AwsContext,
    config: &OpsConfig,
    command: ObjectsCommand,
    format: OutputFormat,
) -> Result<()> {
    let bucket_for = |explicit: &Option<String>| -> Result<String> {
        match explicit {
            Some(bucket) => Ok(bucket.clone()),
            None => Ok(config.storage()?.bucket.clone()),
        }
    };

    match command {
        ObjectsCommand::List { prefix, bucket } => {
            let store = aws.s3(&bucket_for(&bucket)?);
            let entries = objects::list_objects(&store, prefix.as_deref()).await?;
            let mut table = Table::new(&["key", "size", "last_modified"]);
            for entry in entries {
                table.push([
                    entry.key,
                    entry.size.to_string(),
                    opt(entry.last_modified.map(|t| t.format("%Y-%m-%d %H:%M:%S"))),
                ]);
            }
            print_table(&table, format)
        }
        ObjectsCommand::Get { key, out, bucket } => {
            let store = aws.s3(&bucket_for(&bucket)?);
            let data = objects::download_object(&store, &key).await?;
            match out {
                Some(path) => {
                    std::fs::write(&path, &data)?;
                    println!("✅ Wrote {} bytes to {}", data.len(), path);
                }
                None => std::io::stdout().write_all(&data)?,
            }
            Ok(())
        }
        ObjectsCommand::Delete { key, bucket } => {
            let store = aws.s3(&bucket_for(&bucket)?);
            objects::delete_object(&store, &key).await?;
            println!("✅ Deleted {}", key);
            Ok(())
        }
        ObjectsCommand::Purge {
            prefix,
            bucket,
            confirm,
        } => {
            let store = aws.s3(&bucket_for(&bucket)?);
            require_confirmation(confirm, &format!("delete everything under {}", prefix))?;
            let outcome = objects::purge_prefix(&store, &prefix, confirm.dry_run).await?;
            println!("{}", bulk_summary("deleted", &outcome));
            Ok(())
        }
    }
}

fn function_table(functions: &[FunctionSummary]) -> Table {
    let mut table = Table::new(&["name", "runtime", "memory_mb", "timeout_s", "last_modified"]);
    for function in functions {
        table.push([
            function.name.clone(),
            opt(function.runtime.as_ref()),
            opt(function.memory_mb),
            opt(function.timeout_secs),
            opt(function.last_modified.as_ref()),
        ]);
    }
    table
}

fn function_details(function: &FunctionSummary) -> Table {
    let mut table = Table::new(&["field", "value"]);
    table.push(["name".to_string(), function.name.clone()]);
    table.push(["runtime".to_string(), opt(function.runtime.as_ref())]);
    table.push(["handler".to_string(), opt(function.handler.as_ref())]);
    table.push(["role".to_string(), opt(function.role.as_ref())]);
    table.push(["memory_mb".to_string(), opt(function.memory_mb)]);
    table.push(["timeout_s".to_string(), opt(function.timeout_secs)]);
    table.push(["code_size".to_string(), function.code_size.to_string()]);
    table.push(["code_sha256".to_string(), opt(function.code_sha256.as_ref())]);
    table.push(["last_modified".to_string(), opt(function.last_modified.as_ref())]);
    table.push(["state".to_string(), opt(function.state.as_ref())]);
    table.push([
        "last_update_status".to_string(),
        opt(function.last_update_status.as_ref()),
    ]);
    // 只列出環境變數名稱，不輸出值
    table.push(["environment".to_string(), function.environment_keys.join(", ")]);
    table
}

fn source_dir<'a>(config: &'a OpsConfig, explicit: &'a Option<String>) -> Result<&'a str> {
    let configured = config.function.as_ref().and_then(|f| f.source_dir.as_deref());
    pick(explicit, configured, "function.source_dir")
}

fn extra_excludes(config: &OpsConfig) -> Vec<String> {
    config
        .function
        .as_ref()
        .map(|f| f.exclude.clone())
        .unwrap_or_default()
}

async fn package(config: &OpsConfig, source: &Option<String>, out: &str) -> Result<()> {
    let source = source_dir(config, source)?;
    let package = deploy::package_directory(Path::new(source), &extra_excludes(config))?;

    let name = match &config.function {
        Some(function) => format!("{}.zip", function.name),
        None => "function.zip".to_string(),
    };
    let location = deploy::write_package(&LocalStorage::new(out), &name, &package).await?;
    println!(
        "📦 {} files, {} bytes -> {}",
        package.files.len(),
        package.bytes.len(),
        location
    );
    Ok(())
}

async fn run_function(
    aws: &AwsContext,
    config: &OpsConfig,
    command: FunctionCommand,
    format: OutputFormat,
) -> Result<()> {
    let admin = aws.lambda();
    let configured_name = config.function.as_ref().map(|f| f.name.as_str());

    match command {
        FunctionCommand::List => {
            let list = functions::list_functions(&admin).await?;
            print_table(&function_table(&list), format)
        }
        FunctionCommand::Show { name } => {
            let name = pick(&name, configured_name, "function.name")?;
            let function = functions::show_function(&admin, name).await?;
            print_table(&function_details(&function), format)
        }
        FunctionCommand::Invoke { name, payload } => {
            let name = pick(&name, configured_name, "function.name")?;
            let report = functions::invoke_function(&admin, name, &payload).await?;
            println!(
                "status: {}{}",
                report.outcome.status_code,
                report
                    .outcome
                    .function_error
                    .as_ref()
                    .map(|e| format!(" (function error: {})", e))
                    .unwrap_or_default()
            );
            println!("{}", report.rendered_payload);
            Ok(())
        }
        FunctionCommand::Package { source, out } => package(config, &source, &out).await,
        FunctionCommand::Deploy {
            name,
            source,
            via_s3,
            no_wait,
        } => {
            let name = pick(&name, configured_name, "function.name")?;
            let source = source_dir(config, &source)?;
            let package = deploy::package_directory(Path::new(source), &extra_excludes(config))?;

            let options = DeployOptions {
                via_bucket: via_s3,
                publish_wait: !no_wait,
                ..DeployOptions::default()
            };

            let artifacts_store = config.storage.as_ref().map(|s| aws.s3(s.artifacts_bucket()));
            let artifacts = match (&artifacts_store, &config.storage) {
                (Some(store), Some(storage)) => Some(ArtifactTarget {
                    store,
                    bucket: storage.artifacts_bucket(),
                    prefix: storage.artifacts_prefix(),
                }),
                _ => None,
            };

            let summary = deploy::deploy(&admin, artifacts, name, &package, &options).await?;
            print_table(&function_details(&summary), format)
        }
    }
}

async fn run_gateway(
    aws: &AwsContext,
    config: &OpsConfig,
    command: GatewayCommand,
    format: OutputFormat,
) -> Result<()> {
    let admin = aws.apigateway();
    let configured_api = config.gateway.as_ref().and_then(|g| g.api_id.as_deref());

    match command {
        GatewayCommand::Apis => {
            let apis = gateway::list_apis(&admin).await?;
            let mut table = Table::new(&["id", "name", "created", "description"]);
            for api in apis {
                table.push([
                    api.id,
                    api.name,
                    opt(api.created.map(|t| t.format("%Y-%m-%d"))),
                    opt(api.description),
                ]);
            }
            print_table(&table, format)
        }
        GatewayCommand::Resources { api } => {
            let api = pick(&api, configured_api, "gateway.api_id")?;
            let resources = gateway::list_resources(&admin, api).await?;
            let mut table = Table::new(&["id", "path", "methods"]);
            for resource in resources {
                table.push([resource.id, resource.path, resource.methods.join(",")]);
            }
            print_table(&table, format)
        }
        GatewayCommand::Stages { api } => {
            let api = pick(&api, configured_api, "gateway.api_id")?;
            let stages = gateway::list_stages(&admin, api).await?;
            let mut table = Table::new(&["stage", "deployment_id", "last_updated"]);
            for stage in stages {
                table.push([
                    stage.name,
                    opt(stage.deployment_id),
                    opt(stage.last_updated.map(|t| t.format("%Y-%m-%d %H:%M:%S"))),
                ]);
            }
            print_table(&table, format)
        }
        GatewayCommand::Integration {
            resource_id,
            method,
            api,
        } => {
            let api = pick(&api, configured_api, "gateway.api_id")?;
            let integration = gateway::show_integration(&admin, api, &resource_id, &method).await?;
            let mut table = Table::new(&["type", "http_method", "uri"]);
            table.push([
                opt(integration.integration_type),
                opt(integration.http_method),
                opt(integration.uri),
            ]);
            print_table(&table, format)
        }
        GatewayCommand::Ping { .. } => Err(OpsError::ProcessingError {
            message: "ping is handled before AWS clients are built".to_string(),
        }),
    }
}

async fn run_logs(
    aws: &AwsContext,
    config: &OpsConfig,
    command: LogsCommand,
    format: OutputFormat,
) -> Result<()> {
    match command {
        LogsCommand::Tail {
            group,
            since,
            filter,
            limit,
        } => {
            let configured = config.logs.as_ref().map(|l| l.group.as_str());
            let group = pick(&group, configured, "logs.group")?;
            let window = logs::parse_window(&since)?;
            let events = logs::tail(
                &aws.logs(),
                group,
                window,
                filter.as_deref(),
                limit,
                chrono::Utc::now(),
            )
            .await?;

            let mut table = Table::new(&["timestamp", "stream", "message"]);
            for event in events {
                table.push([format_timestamp(event.timestamp_ms), event.stream, event.message]);
            }
            print_table(&table, format)
        }
    }
}

async fn run_bounces(
    aws: &AwsContext,
    config: &OpsConfig,
    command: BouncesCommand,
    format: OutputFormat,
) -> Result<()> {
    match command {
        BouncesCommand::Scan {
            since,
            folder,
            apply,
            confirm,
        } => {
            let mailbox_config = bounce_mailbox(config, apply, confirm)?;
            let folder = folder.unwrap_or_else(|| mailbox_config.folder.clone());
            let mailbox = ImapMailbox::new(mailbox_config.clone());

            let scan = bounces::scan_bounces(&mailbox, &folder, since).await?;
            let mut table = Table::new(&["recipient", "status", "campaign_id", "diagnostic"]);
            for bounce in &scan.bounces {
                table.push([
                    bounce.recipient.clone(),
                    opt(bounce.status_code.as_ref()),
                    opt(bounce.campaign_id.as_ref()),
                    opt(bounce.diagnostic.as_ref()),
                ]);
            }
            print_table(&table, format)?;

            if apply {
                let outcome = bounces::apply_bounces(
                    &aws.dynamodb(),
                    &config.tables,
                    &scan.bounces,
                    confirm.dry_run,
                )
                .await?;
                println!("{}", bulk_summary("marked bounced", &outcome));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_confirmation() {
        let none = Confirm {
            dry_run: false,
            yes: false,
        };
        assert!(require_confirmation(none, "purge").is_err());
        assert!(require_confirmation(Confirm { yes: true, ..none }, "purge").is_ok());
        assert!(require_confirmation(Confirm { dry_run: true, ..none }, "purge").is_ok());
    }

    #[test]
    fn test_bounce_apply_is_refused_before_mailbox_access() {
        let none = Confirm {
            dry_run: false,
            yes: false,
        };
        // 沒有 mailbox 設定時，確認錯誤仍須先出現
        let bare = OpsConfig::default();
        let err = bounce_mailbox(&bare, true, none).unwrap_err();
        assert!(err.to_string().contains("--yes"));
        assert!(matches!(
            bounce_mailbox(&bare, false, none),
            Err(OpsError::MissingConfigError { .. })
        ));

        let config = OpsConfig {
            mailbox: Some(MailboxConfig {
                host: "imap.example.com".to_string(),
                port: 993,
                username: "bounces".to_string(),
                password: "secret".to_string(),
                folder: "INBOX".to_string(),
            }),
            ..OpsConfig::default()
        };
        assert!(bounce_mailbox(&config, true, none).is_err());
        assert!(bounce_mailbox(&config, true, Confirm { yes: true, ..none }).is_ok());
        assert!(bounce_mailbox(&config, true, Confirm { dry_run: true, ..none }).is_ok());
        assert!(bounce_mailbox(&config, false, none).is_ok());
    }

    #[test]
    fn test_function_details_lists_environment_names() {
        let function = FunctionSummary {
            name: "campaign-sender".to_string(),
            environment_keys: vec!["API_KEY".to_string(), "DB_PASSWORD".to_string()],
            ..FunctionSummary::default()
        };

        let rendered = function_details(&function).render(OutputFormat::Csv).unwrap();
        assert!(rendered.contains("environment,\"API_KEY, DB_PASSWORD\""));
        assert!(!rendered.contains('='));
    }

    #[test]
    fn test_pick_prefers_explicit_value() {
        let explicit = Some("cli-fn".to_string());
        assert_eq!(pick(&explicit, Some("config-fn"), "function.name").unwrap(), "cli-fn");
        assert_eq!(pick(&None, Some("config-fn"), "function.name").unwrap(), "config-fn");
        assert!(matches!(
            pick(&None, None, "function.name"),
            Err(OpsError::MissingConfigError { .. })
        ));
    }
}
