use crate::domain::model::{CodeSource, FunctionSummary, InvokeOutcome, Page};
use crate::domain::ports::FunctionAdmin;
use crate::utils::error::{OpsError, Result};
use async_trait::async_trait;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use aws_sdk_lambda::Client as LambdaClient;

#[derive(Debug, Clone)]
pub struct LambdaAdmin {
    client: LambdaClient,
}

impl LambdaAdmin {
    pub fn new(client: LambdaClient) -> Self {
        Self { client }
    }
}

// GetFunctionConfiguration、UpdateFunctionCode 與 ListFunctions 回傳相同欄位
macro_rules! function_summary {
    ($config:expr) => {{
        let config = $config;
        let mut environment_keys: Vec<String> = config
            .environment()
            .and_then(|env| env.variables())
            .map(|vars| vars.keys().cloned().collect())
            .unwrap_or_default();
        environment_keys.sort();

        FunctionSummary {
            name: config.function_name().unwrap_or_default().to_string(),
            runtime: config.runtime().map(|r| r.as_str().to_string()),
            handler: config.handler().map(str::to_string),
            role: config.role().map(str::to_string),
            memory_mb: config.memory_size(),
            timeout_secs: config.timeout(),
            code_size: config.code_size(),
            code_sha256: config.code_sha256().map(str::to_string),
            last_modified: config.last_modified().map(str::to_string),
            state: config.state().map(|s| s.as_str().to_string()),
            last_update_status: config.last_update_status().map(|s| s.as_str().to_string()),
            environment_keys,
        }
    }};
}

#[async_trait]
impl FunctionAdmin for LambdaAdmin {
    async fn list_functions_page(
        &self,
        marker: Option<String>,
    ) -> Result<Page<FunctionSummary, String>> {
        let output = self
            .client
            .list_functions()
            .set_marker(marker)
            .send()
            .await
            .map_err(|e| OpsError::service("lambda", "list_functions", e))?;

        Ok(Page {
            items: output
                .functions()
                .iter()
                .map(|f| function_summary!(f))
                .collect(),
            next: output.next_marker().map(str::to_string),
        })
    }

    async fn get_function(&self, name: &str) -> Result<FunctionSummary> {
        let output = self
            .client
            .get_function_configuration()
            .function_name(name)
            .send()
            .await
            .map_err(|e| {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_resource_not_found_exception())
                    .unwrap_or(false);
                if not_found {
                    OpsError::not_found(format!("function {}", name))
                } else {
                    OpsError::service("lambda", "get_function_configuration", e)
                }
            })?;

        Ok(function_summary!(&output))
    }

    async fn update_code(&self, name: &str, code: CodeSource) -> Result<FunctionSummary> {
        let request = self.client.update_function_code().function_name(name);
        let request = match code {
            CodeSource::ZipBytes(bytes) => request.zip_file(Blob::new(bytes)),
            CodeSource::Bucket { bucket, key } => request.s3_bucket(bucket).s3_key(key),
        };

        let output = request
            .send()
            .await
            .map_err(|e| OpsError::service("lambda", "update_function_code", e))?;

        Ok(function_summary!(&output))
    }

    async fn invoke(&self, name: &str, payload: Vec<u8>) -> Result<InvokeOutcome> {
        let output = self
            .client
            .invoke()
            .function_name(name)
            .invocation_type(InvocationType::RequestResponse)
            .payload(Blob::new(payload))
            .send()
            .await
            .map_err(|e| OpsError::service("lambda", "invoke", e))?;

        Ok(InvokeOutcome {
            status_code: output.status_code(),
            function_error: output.function_error().map(str::to_string),
            executed_version: output.executed_version().map(str::to_string),
            payload: output
                .payload()
                .map(|blob| blob.as_ref().to_vec())
                .unwrap_or_default(),
        })
    }
}
