// Scheduled bounce sweep: scan the bounce mailbox and mark bounced addresses.

#[cfg(feature = "lambda")]
use campaign_ops::adapters::{mailbox::ImapMailbox, AwsContext};
#[cfg(feature = "lambda")]
use campaign_ops::core::bounces;
#[cfg(feature = "lambda")]
use campaign_ops::utils::{logger, validation::Validate};
#[cfg(feature = "lambda")]
use campaign_ops::OpsConfig;
#[cfg(feature = "lambda")]
use chrono::NaiveDate;
#[cfg(feature = "lambda")]
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
#[cfg(feature = "lambda")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "lambda")]
#[derive(Debug, Default, Deserialize)]
pub struct Request {
    /// 只掃描此日期之後的郵件
    pub since: Option<NaiveDate>,
    pub folder: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

#[cfg(feature = "lambda")]
#[derive(Debug, Serialize)]
pub struct Response {
    pub messages: usize,
    pub bounces: usize,
    pub marked: usize,
    pub skipped: usize,
    pub failed: usize,
    pub dry_run: bool,
}

#[cfg(feature = "lambda")]
async fn function_handler(event: LambdaEvent<Request>) -> Result<Response, Error> {
    tracing::info!("Starting bounce sweep");
    let request = event.payload;

    let config = OpsConfig::from_env()?;
    config.validate()?;
    let mailbox_config = config.mailbox()?;
    let folder = request
        .folder
        .unwrap_or_else(|| mailbox_config.folder.clone());

    let mailbox = ImapMailbox::new(mailbox_config.clone());
    let scan = bounces::scan_bounces(&mailbox, &folder, request.since).await?;

    let aws = AwsContext::load(&config.aws).await;
    let outcome =
        bounces::apply_bounces(&aws.dynamodb(), &config.tables, &scan.bounces, request.dry_run)
            .await?;

    for (target, error) in &outcome.failures {
        tracing::warn!("⚠️ Could not mark {}: {}", target, error);
    }

    let response = Response {
        messages: scan.messages,
        bounces: scan.bounces.len(),
        marked: outcome.succeeded,
        skipped: outcome.skipped,
        failed: outcome.failures.len(),
        dry_run: outcome.dry_run,
    };

    tracing::info!("Bounce sweep completed: {:?}", response);
    Ok(response)
}

#[cfg(feature = "lambda")]
#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();
    run(service_fn(function_handler)).await
}

