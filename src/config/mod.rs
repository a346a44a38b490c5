pub mod args;

use aws_config::SdkConfig;
use chrono::{DateTime, Utc};

use crate::types::{ClientConfigLocation, S3Credentials};

mod client_builder;

/// Main configuration for a re-invocation run.
///
/// Holds everything a [`ReinvokePipeline`](crate::ReinvokePipeline) needs:
/// the bucket and listing range, the filters, the target function, the
/// concurrency cap and the AWS client settings. It is immutable for the
/// duration of a run.
///
/// # Quick Start
///
/// ```
/// use s3_reinvoke_lambda::Config;
///
/// let mut config = Config::for_target("my-bucket", "my-function");
/// config.prefix = "images/".to_string();
/// config.dry_run = true;
/// assert_eq!(config.max_concurrency, 100);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub bucket: String,
    pub prefix: String,
    pub start_after: String,
    pub function_name: String,
    pub filter_config: FilterConfig,
    pub max_concurrency: u16,
    pub dry_run: bool,
    pub max_keys: i32,
    pub show_no_progress: bool,
    pub client_config: Option<ClientConfig>,
    pub tracing_config: Option<TracingConfig>,
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
}

impl Config {
    /// Create a `Config` with CLI defaults for the given bucket and function.
    pub fn for_target(bucket: &str, function_name: &str) -> Self {
        Config {
            bucket: bucket.to_string(),
            function_name: function_name.to_string(),
            ..Config::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bucket: String::new(),
            prefix: String::new(),
            start_after: String::new(),
            function_name: String::new(),
            filter_config: FilterConfig::default(),
            max_concurrency: 100,
            dry_run: false,
            max_keys: 1000,
            show_no_progress: false,
            client_config: None,
            tracing_config: None,
            auto_complete_shell: None,
        }
    }
}

/// AWS client configuration shared by the S3 and Lambda clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_config_location: ClientConfigLocation,
    pub credential: S3Credentials,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub lambda_endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub retry_config: RetryConfig,
    pub cli_timeout_config: CLITimeoutConfig,
    pub disable_stalled_stream_protection: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            client_config_location: ClientConfigLocation::default(),
            credential: S3Credentials::FromEnvironment,
            region: None,
            endpoint_url: None,
            lambda_endpoint_url: None,
            force_path_style: false,
            retry_config: RetryConfig::default(),
            cli_timeout_config: CLITimeoutConfig::default(),
            disable_stalled_stream_protection: false,
        }
    }
}

/// Resolved AWS clients plus the region they were built for.
#[derive(Debug, Clone)]
pub struct AwsClients {
    pub sdk_config: SdkConfig,
    pub s3_client: aws_sdk_s3::Client,
    pub lambda_client: aws_sdk_lambda::Client,
}

impl AwsClients {
    pub fn region(&self) -> Option<String> {
        self.sdk_config.region().map(|region| region.to_string())
    }
}

/// Retry configuration for AWS SDK operations.
///
/// Only the SDK's own retries for transient errors apply; failed invocations
/// are never retried by the tool.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub aws_max_attempts: u32,
    pub initial_backoff_milliseconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            aws_max_attempts: 3,
            initial_backoff_milliseconds: 100,
        }
    }
}

/// Timeout configuration for AWS SDK operations.
#[derive(Debug, Clone, Default)]
pub struct CLITimeoutConfig {
    pub operation_timeout_milliseconds: Option<u64>,
    pub operation_attempt_timeout_milliseconds: Option<u64>,
    pub connect_timeout_milliseconds: Option<u64>,
    pub read_timeout_milliseconds: Option<u64>,
}

/// Tracing (logging) configuration.
#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub aws_sdk_tracing: bool,
    pub span_events_tracing: bool,
    pub disable_color_tracing: bool,
}

/// Filter configuration for object selection.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    /// Accept only objects modified at or before this time.
    pub before_time: Option<DateTime<Utc>>,
    /// Accepted lowercase extensions with a leading dot. Empty accepts all.
    pub lower_extensions: Vec<String>,
}
