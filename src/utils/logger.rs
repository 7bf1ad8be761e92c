use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CRATE_TARGET: &str = "campaign_ops";

/// 本 crate 依 verbose 決定層級，AWS SDK 等依賴只顯示警告
fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("{}={},warn", CRATE_TARGET, level)
}

/// `RUST_LOG` wins over the built-in directives.
fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

pub fn init_cli_logger(verbose: bool) {
    // 日誌寫到 stderr，stdout 保留給報表輸出
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_file(false)
        .with_line_number(false)
        .compact();

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(layer)
        .try_init()
    {
        eprintln!("Logger already initialised: {}", e);
    }
}

pub fn init_lambda_logger() {
    // CloudWatch 自帶時間戳，事件欄位攤平成頂層 JSON 鍵
    let layer = tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_target(false)
        .without_time();

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter(false))
        .with(layer)
        .try_init()
    {
        eprintln!("Logger already initialised: {}", e);
    }
}
