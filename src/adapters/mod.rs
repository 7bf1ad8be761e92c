// Adapters layer: concrete implementations of the domain ports for AWS services,
// the bounce mailbox and the local filesystem.

pub mod apigateway;
pub mod cognito;
pub mod dynamodb;
pub mod lambda;
pub mod local;
pub mod logs;
pub mod mailbox;
pub mod s3;

use crate::config::ops_config::AwsConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};

/// 共用的 AWS SDK 設定；每個指令只建立自己需要的客戶端
#[derive(Debug, Clone)]
pub struct AwsContext {
    sdk: SdkConfig,
}

impl AwsContext {
    pub async fn load(aws: &AwsConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &aws.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &aws.profile {
            loader = loader.profile_name(profile);
        }
        let sdk = loader.load().await;
        tracing::debug!("AWS region: {:?}", sdk.region());
        Self { sdk }
    }

    pub fn dynamodb(&self) -> dynamodb::DynamoStore {
        dynamodb::DynamoStore::new(aws_sdk_dynamodb::Client::new(&self.sdk))
    }

    pub fn s3(&self, bucket: &str) -> s3::S3Storage {
        s3::S3Storage::new(aws_sdk_s3::Client::new(&self.sdk), bucket.to_string())
    }

    pub fn lambda(&self) -> lambda::LambdaAdmin {
        lambda::LambdaAdmin::new(aws_sdk_lambda::Client::new(&self.sdk))
    }

    pub fn apigateway(&self) -> apigateway::ApiGatewayAdmin {
        apigateway::ApiGatewayAdmin::new(aws_sdk_apigateway::Client::new(&self.sdk))
    }

    pub fn logs(&self) -> logs::CloudWatchLogs {
        logs::CloudWatchLogs::new(aws_sdk_cloudwatchlogs::Client::new(&self.sdk))
    }

    pub fn cognito(&self) -> cognito::CognitoDirectory {
        cognito::CognitoDirectory::new(aws_sdk_cognitoidentityprovider::Client::new(&self.sdk))
    }
}
