use std::time::Duration;

use anyhow::{Result, anyhow};
use aws_runtime::env_config::file::{EnvConfigFileKind, EnvConfigFiles};
use aws_config::retry::RetryConfig as SdkRetryConfig;
use aws_config::stalled_stream_protection::StalledStreamProtectionConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, ConfigLoader, Region, SdkConfig};
use aws_sdk_s3::config::Credentials;
use tracing::debug;

use crate::config::{AwsClients, ClientConfig};
use crate::types::S3Credentials;
use crate::types::error::S3ReinvokeError;

const CREDENTIALS_PROVIDER_NAME: &str = "s3-reinvoke-lambda";

impl ClientConfig {
    /// Resolve the shared AWS configuration and build the S3 and Lambda
    /// clients from it.
    ///
    /// Fails when no region can be resolved from the options, the
    /// environment or the profile.
    pub async fn create_clients(&self) -> Result<AwsClients> {
        let sdk_config = self.load_sdk_config().await;

        if sdk_config.region().is_none() {
            return Err(anyhow!(S3ReinvokeError::ClientConfig(
                "AWS region could not be resolved. Set --region or AWS_REGION.".to_string()
            )));
        }

        debug!(
            region = sdk_config.region().map(|r| r.to_string()),
            "AWS configuration has been loaded."
        );

        let mut s3_config_builder =
            aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(self.force_path_style);
        if let Some(endpoint_url) = &self.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        let mut lambda_config_builder = aws_sdk_lambda::config::Builder::from(&sdk_config);
        if let Some(lambda_endpoint_url) = &self.lambda_endpoint_url {
            lambda_config_builder = lambda_config_builder.endpoint_url(lambda_endpoint_url);
        }

        Ok(AwsClients {
            s3_client: aws_sdk_s3::Client::from_conf(s3_config_builder.build()),
            lambda_client: aws_sdk_lambda::Client::from_conf(lambda_config_builder.build()),
            sdk_config,
        })
    }

    async fn load_sdk_config(&self) -> SdkConfig {
        let mut config_loader = aws_config::defaults(BehaviorVersion::latest());

        config_loader = self.load_config_files(config_loader);
        config_loader = self.load_credential(config_loader);

        if let Some(region) = &self.region {
            config_loader = config_loader.region(Region::new(region.clone()));
        }

        config_loader = config_loader
            .retry_config(self.build_retry_config())
            .timeout_config(self.build_timeout_config());

        if self.disable_stalled_stream_protection {
            config_loader =
                config_loader.stalled_stream_protection(StalledStreamProtectionConfig::disabled());
        }

        config_loader.load().await
    }

    fn load_config_files(&self, config_loader: ConfigLoader) -> ConfigLoader {
        let location = &self.client_config_location;
        if location.aws_config_file.is_none() && location.aws_shared_credentials_file.is_none() {
            return config_loader;
        }

        let mut profile_files_builder = EnvConfigFiles::builder();
        if let Some(aws_config_file) = &location.aws_config_file {
            profile_files_builder =
                profile_files_builder.with_file(EnvConfigFileKind::Config, aws_config_file);
        } else {
            profile_files_builder = profile_files_builder.include_default_config_file(true);
        }
        if let Some(aws_shared_credentials_file) = &location.aws_shared_credentials_file {
            profile_files_builder = profile_files_builder
                .with_file(EnvConfigFileKind::Credentials, aws_shared_credentials_file);
        } else {
            profile_files_builder = profile_files_builder.include_default_credentials_file(true);
        }

        config_loader.profile_files(profile_files_builder.build())
    }

    fn load_credential(&self, config_loader: ConfigLoader) -> ConfigLoader {
        match &self.credential {
            S3Credentials::Profile(profile_name) => config_loader.profile_name(profile_name),
            S3Credentials::Credentials { access_keys } => {
                let credentials = Credentials::new(
                    access_keys.access_key.to_string(),
                    access_keys.secret_access_key.to_string(),
                    access_keys.session_token.clone(),
                    None,
                    CREDENTIALS_PROVIDER_NAME,
                );
                config_loader.credentials_provider(credentials)
            }
            S3Credentials::FromEnvironment => config_loader,
        }
    }

    fn build_retry_config(&self) -> SdkRetryConfig {
        SdkRetryConfig::standard()
            .with_max_attempts(self.retry_config.aws_max_attempts)
            .with_initial_backoff(Duration::from_millis(
                self.retry_config.initial_backoff_milliseconds,
            ))
    }

    fn build_timeout_config(&self) -> TimeoutConfig {
        let timeouts = &self.cli_timeout_config;
        let mut builder = TimeoutConfig::builder();

        if let Some(ms) = timeouts.operation_timeout_milliseconds {
            builder = builder.operation_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = timeouts.operation_attempt_timeout_milliseconds {
            builder = builder.operation_attempt_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = timeouts.connect_timeout_milliseconds {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = timeouts.read_timeout_milliseconds {
            builder = builder.read_timeout(Duration::from_millis(ms));
        }

        builder.build()
    }
}
