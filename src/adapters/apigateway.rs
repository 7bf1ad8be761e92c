use crate::domain::model::{ApiResource, ApiSummary, IntegrationSummary, Page, StageSummary};
use crate::domain::ports::GatewayAdmin;
use crate::utils::error::{OpsError, Result};
use async_trait::async_trait;
use aws_sdk_apigateway::primitives::DateTime as SmithyDateTime;
use aws_sdk_apigateway::Client as ApiGatewayClient;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct ApiGatewayAdmin {
    client: ApiGatewayClient,
}

impl ApiGatewayAdmin {
    pub fn new(client: ApiGatewayClient) -> Self {
        Self { client }
    }
}

fn to_utc(value: Option<&SmithyDateTime>) -> Option<DateTime<Utc>> {
    value.and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
}

#[async_trait]
impl GatewayAdmin for ApiGatewayAdmin {
    async fn list_apis_page(&self, position: Option<String>) -> Result<Page<ApiSummary, String>> {
        let output = self
            .client
            .get_rest_apis()
            .set_position(position)
            .send()
            .await
            .map_err(|e| OpsError::service("apigateway", "get_rest_apis", e))?;

        let items = output
            .items()
            .iter()
            .map(|api| ApiSummary {
                id: api.id().unwrap_or_default().to_string(),
                name: api.name().unwrap_or_default().to_string(),
                description: api.description().map(str::to_string),
                created: to_utc(api.created_date()),
            })
            .collect();

        Ok(Page {
            items,
            next: output.position().map(str::to_string),
        })
    }

    async fn list_resources_page(
        &self,
        api_id: &str,
        position: Option<String>,
    ) -> Result<Page<ApiResource, String>> {
        let output = self
            .client
            .get_resources()
            .rest_api_id(api_id)
            .set_position(position)
            .send()
            .await
            .map_err(|e| OpsError::service("apigateway", "get_resources", e))?;

        let items = output
            .items()
            .iter()
            .map(|resource| {
                let mut methods: Vec<String> = resource
                    .resource_methods()
                    .map(|m| m.keys().cloned().collect())
                    .unwrap_or_default();
                methods.sort();
                ApiResource {
                    id: resource.id().unwrap_or_default().to_string(),
                    path: resource.path().unwrap_or_default().to_string(),
                    methods,
                }
            })
            .collect();

        Ok(Page {
            items,
            next: output.position().map(str::to_string),
        })
    }

    async fn list_stages(&self, api_id: &str) -> Result<Vec<StageSummary>> {
        let output = self
            .client
            .get_stages()
            .rest_api_id(api_id)
            .send()
            .await
            .map_err(|e| OpsError::service("apigateway", "get_stages", e))?;

        Ok(output
            .item()
            .iter()
            .map(|stage| StageSummary {
                name: stage.stage_name().unwrap_or_default().to_string(),
                deployment_id: stage.deployment_id().map(str::to_string),
                last_updated: to_utc(stage.last_updated_date()),
            })
            .collect())
    }

    async fn get_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        http_method: &str,
    ) -> Result<IntegrationSummary> {
        let output = self
            .client
            .get_integration()
            .rest_api_id(api_id)
            .resource_id(resource_id)
            .http_method(http_method)
            .send()
            .await
            .map_err(|e| {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_not_found_exception())
                    .unwrap_or(false);
                if not_found {
                    OpsError::not_found(format!(
                        "integration {} {} on api {}",
                        http_method, resource_id, api_id
                    ))
                } else {
                    OpsError::service("apigateway", "get_integration", e)
                }
            })?;

        Ok(IntegrationSummary {
            integration_type: output.r#type().map(|t| t.as_str().to_string()),
            http_method: output.http_method().map(str::to_string),
            uri: output.uri().map(str::to_string),
        })
    }
}
