use crate::core::{collect_pages, GatewayAdmin};
use crate::domain::model::{ApiResource, ApiSummary, IntegrationSummary, StageSummary};
use crate::utils::error::Result;
use crate::utils::validation::validate_url;
use reqwest::Client;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct PingResult {
    pub url: String,
    pub status: u16,
    pub elapsed: Duration,
    pub body_bytes: usize,
}

impl PingResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub async fn list_apis<G: GatewayAdmin>(admin: &G) -> Result<Vec<ApiSummary>> {
    let mut apis = collect_pages(None, move |position| admin.list_apis_page(position)).await?;
    apis.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(apis)
}

pub async fn list_resources<G: GatewayAdmin>(admin: &G, api_id: &str) -> Result<Vec<ApiResource>> {
    let mut resources = collect_pages(None, move |position| {
        admin.list_resources_page(api_id, position)
    })
    .await?;
    resources.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(resources)
}

pub async fn list_stages<G: GatewayAdmin>(admin: &G, api_id: &str) -> Result<Vec<StageSummary>> {
    let mut stages = admin.list_stages(api_id).await?;
    stages.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(stages)
}

pub async fn show_integration<G: GatewayAdmin>(
    admin: &G,
    api_id: &str,
    resource_id: &str,
    http_method: &str,
) -> Result<IntegrationSummary> {
    admin
        .get_integration(api_id, resource_id, &http_method.to_ascii_uppercase())
        .await
}

/// One GET against a deployed stage. Non-2xx is reported, not raised.
pub async fn ping(client: &Client, url: &str) -> Result<PingResult> {
    validate_url("url", url)?;

    tracing::debug!("Making request to: {}", url);
    let started = Instant::now();
    let response = client.get(url).send().await?;
    let status = response.status().as_u16();
    let body = response.bytes().await?;
    let elapsed = started.elapsed();

    tracing::debug!("Response status: {} in {:?}", status, elapsed);
    Ok(PingResult {
        url: url.to_string(),
        status,
        elapsed,
        body_bytes: body.len(),
    })
}
