use crate::domain::model::{Page, UserSummary};
use crate::domain::ports::UserDirectory;
use crate::utils::error::{OpsError, Result};
use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;

#[derive(Debug, Clone)]
pub struct CognitoDirectory {
    client: CognitoClient,
}

impl CognitoDirectory {
    pub fn new(client: CognitoClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UserDirectory for CognitoDirectory {
    async fn list_users_page(
        &self,
        pool_id: &str,
        token: Option<String>,
    ) -> Result<Page<UserSummary, String>> {
        let output = self
            .client
            .list_users()
            .user_pool_id(pool_id)
            .set_pagination_token(token)
            .send()
            .await
            .map_err(|e| OpsError::service("cognito-idp", "list_users", e))?;

        let items = output
            .users()
            .iter()
            .map(|user| UserSummary {
                username: user.username().unwrap_or_default().to_string(),
                email: user
                    .attributes()
                    .iter()
                    .find(|attr| attr.name() == "email")
                    .and_then(|attr| attr.value())
                    .map(str::to_string),
                status: user.user_status().map(|s| s.as_str().to_string()),
                enabled: user.enabled(),
            })
            .collect();

        Ok(Page {
            items,
            next: output.pagination_token().map(str::to_string),
        })
    }
}
