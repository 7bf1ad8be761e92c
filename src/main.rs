use campaign_ops::config::cli::Cli;
use campaign_ops::utils::error::{ErrorSeverity, OpsError};
use campaign_ops::utils::{logger, validation::Validate};
use campaign_ops::{app, OpsConfig};
use clap::Parser;

fn report_failure(stage: &str, e: &OpsError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
        stage,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 服務錯誤，可重試
        ErrorSeverity::High => 1,     // 設定或資料錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    };
    std::process::exit(exit_code);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);
    tracing::debug!("CLI arguments: {:?}", cli);

    let mut config = match OpsConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => report_failure("Loading configuration", &e),
    };
    cli.apply_overrides(&mut config);

    // 驗證配置
    if let Err(e) = config.validate() {
        report_failure("Configuration validation", &e);
    }

    if let Err(e) = app::run(cli, config).await {
        report_failure("Command", &e);
    }
}
