use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpsError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{service} {operation} failed: {message}")]
    ServiceError {
        service: &'static str,
        operation: &'static str,
        message: String,
    },

    #[error("Mailbox error: {message}")]
    MailboxError { message: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Deployment error: {message}")]
    DeployError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Service,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl OpsError {
    /// 將 SDK 錯誤轉換為帶完整上下文的服務錯誤
    pub fn service<E>(service: &'static str, operation: &'static str, err: E) -> Self
    where
        E: std::error::Error,
    {
        OpsError::ServiceError {
            service,
            operation,
            message: aws_smithy_types::error::display::DisplayErrorContext(err).to_string(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        OpsError::NotFound { what: what.into() }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            OpsError::ConfigError { .. }
            | OpsError::MissingConfigError { .. }
            | OpsError::InvalidConfigValueError { .. }
            | OpsError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            OpsError::ServiceError { .. }
            | OpsError::HttpError(_)
            | OpsError::MailboxError { .. }
            | OpsError::DeployError { .. } => ErrorCategory::Service,
            OpsError::NotFound { .. }
            | OpsError::CsvError(_)
            | OpsError::SerializationError(_)
            | OpsError::ProcessingError { .. } => ErrorCategory::Data,
            OpsError::ZipError(_) | OpsError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Service => ErrorSeverity::Medium,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            OpsError::ServiceError { .. } => {
                "Check AWS credentials, region and that the named resource exists"
            }
            OpsError::HttpError(_) => "Check the URL and network connectivity",
            OpsError::MailboxError { .. } => "Check mailbox host, port and credentials",
            OpsError::NotFound { .. } => "Verify the identifier and the configured table/bucket",
            OpsError::DeployError { .. } => {
                "Inspect the function with `function show` and its logs with `logs tail`"
            }
            OpsError::ConfigError { .. }
            | OpsError::MissingConfigError { .. }
            | OpsError::InvalidConfigValueError { .. }
            | OpsError::ConfigValidationError { .. } => {
                "Fix the configuration file or the OPS_* environment variables"
            }
            OpsError::ZipError(_) | OpsError::IoError(_) => {
                "Check file paths and permissions on the local machine"
            }
            OpsError::CsvError(_)
            | OpsError::SerializationError(_)
            | OpsError::ProcessingError { .. } => "Check the input data format",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            OpsError::ServiceError {
                service, operation, ..
            } => format!("AWS {} call '{}' failed", service, operation),
            OpsError::NotFound { what } => format!("{} does not exist", what),
            OpsError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting '{}': {}", field, reason)
            }
            OpsError::MissingConfigError { field } => {
                format!("Setting '{}' is required for this command", field)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OpsError>;
