use crate::config::{CLITimeoutConfig, ClientConfig, Config, FilterConfig, RetryConfig, TracingConfig};
use crate::types::{AccessKeys, ClientConfigLocation, S3Credentials};
use chrono::{DateTime, Utc};
use clap::Parser;
use clap::builder::NonEmptyStringValueParser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::ffi::OsString;
use std::path::PathBuf;


// ---------------------------------------------------------------------------
// Default constants
// ---------------------------------------------------------------------------

const DEFAULT_PARALLEL: u16 = 100;
const DEFAULT_MAX_KEYS: i32 = 1000;
const MAX_KEYS_UPPER_BOUND: i32 = 1000;
const DEFAULT_AWS_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_INITIAL_BACKOFF_MILLISECONDS: u64 = 100;
const DEFAULT_DRY_RUN: bool = false;
const DEFAULT_SHOW_NO_PROGRESS: bool = false;
const DEFAULT_JSON_TRACING: bool = false;
const DEFAULT_AWS_SDK_TRACING: bool = false;
const DEFAULT_SPAN_EVENTS_TRACING: bool = false;
const DEFAULT_DISABLE_COLOR_TRACING: bool = false;
const DEFAULT_FORCE_PATH_STYLE: bool = false;
const DEFAULT_DISABLE_STALLED_STREAM_PROTECTION: bool = false;

// ---------------------------------------------------------------------------
// Error messages
// ---------------------------------------------------------------------------

const ERROR_MESSAGE_PARALLEL_ZERO: &str = "Parallelism must be at least 1.";
const ERROR_MESSAGE_MAX_KEYS_OUT_OF_RANGE: &str = "Max keys must be between 1 and 1000.";
const ERROR_MESSAGE_EMPTY_BUCKET: &str = "Bucket name must not be empty.";
const ERROR_MESSAGE_EMPTY_FUNCTION_NAME: &str = "Function name must not be empty.";
const ERROR_MESSAGE_INVALID_MODIFIED_BEFORE: &str =
    "Invalid date format as RFC3339 (e.g. 2024-06-21T19:54:00+09:00)";

// ---------------------------------------------------------------------------
// Value parser helpers
// ---------------------------------------------------------------------------

/// Normalize an extension filter value to lowercase with a leading dot.
fn parse_extension(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed == "." {
        return Err("extension must not be empty".to_string());
    }

    let lower = trimmed.to_lowercase();
    if lower.starts_with('.') {
        Ok(lower)
    } else {
        Ok(format!(".{lower}"))
    }
}

fn parse_modified_before(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("{ERROR_MESSAGE_INVALID_MODIFIED_BEFORE}: {s}: {e}"))
}

// ---------------------------------------------------------------------------
// CLIArgs (clap-derived argument struct)
// ---------------------------------------------------------------------------

/// s3-reinvoke-lambda - Re-invoke a Lambda function for objects in an S3 bucket.
///
/// Lists the bucket, filters the objects and sends a synthetic
/// `ObjectCreated:Put` event for each remaining object to the function.
///
/// Example:
///   s3-reinvoke-lambda my-bucket my-function --dry-run
///   s3-reinvoke-lambda my-bucket my-function -p images/ -x .jpg -x .png
///   s3-reinvoke-lambda my-bucket my-function -b 2024-06-21T19:54:00+09:00 -P 20
#[derive(Parser, Clone, Debug)]
#[command(name = "s3-reinvoke-lambda", version, about, long_about = None)]
pub struct CLIArgs {
    /// Bucket to list.
    #[arg(
        value_parser = NonEmptyStringValueParser::new(),
        default_value_if("auto_complete_shell", clap::builder::ArgPredicate::IsPresent, "ignored"),
        required = false,
    )]
    pub bucket: String,

    /// Name or ARN of the Lambda function to invoke.
    #[arg(
        value_parser = NonEmptyStringValueParser::new(),
        default_value_if("auto_complete_shell", clap::builder::ArgPredicate::IsPresent, "ignored"),
        required = false,
    )]
    pub function_name: String,

    // -----------------------------------------------------------------------
    // General options
    // -----------------------------------------------------------------------
    /// Simulation mode. Lists, filters and builds payloads but does not invoke.
    #[arg(short = 'd', long, env = "S3_REINVOKE_LAMBDA_DRY_RUN", default_value_t = DEFAULT_DRY_RUN, help_heading = "General")]
    pub dry_run: bool,

    /// Don't show the progress line.
    #[arg(long, env = "S3_REINVOKE_LAMBDA_SHOW_NO_PROGRESS", default_value_t = DEFAULT_SHOW_NO_PROGRESS, help_heading = "General")]
    pub show_no_progress: bool,

    // -----------------------------------------------------------------------
    // Filter options
    // -----------------------------------------------------------------------
    /// Key prefix to filter objects.
    #[arg(short = 'p', long, default_value = "", help_heading = "Filter")]
    pub prefix: String,

    /// Start listing after this key.
    #[arg(short = 'a', long, env = "S3_REINVOKE_LAMBDA_START_AFTER", default_value = "", help_heading = "Filter")]
    pub start_after: String,

    /// Invoke only for objects modified at or before this time.
    #[arg(
        short = 'b',
        long,
        env = "S3_REINVOKE_LAMBDA_MODIFIED_BEFORE",
        value_parser = NonEmptyStringValueParser::new(),
        help_heading = "Filter",
        long_help = r#"Invoke only for objects modified at or before given time (RFC3339 datetime).
Example: 2024-06-21T19:54:00+09:00"#
    )]
    pub modified_before: Option<String>,

    /// Lowercased extensions to filter objects (e.g. '.jpg', '.png').
    #[arg(
        short = 'x',
        long = "ext",
        value_delimiter = ',',
        value_parser = parse_extension,
        help_heading = "Filter",
        long_help = r#"Invoke only for objects with one of the given extensions.
Repeatable and comma separated. Matching is case-insensitive.
Example: -x .jpg -x .png"#
    )]
    pub ext: Vec<String>,

    // -----------------------------------------------------------------------
    // Performance options
    // -----------------------------------------------------------------------
    /// Number of parallel invocations. Default: 100.
    #[arg(short = 'P', long, env = "S3_REINVOKE_LAMBDA_PARALLEL", default_value_t = DEFAULT_PARALLEL, help_heading = "Performance")]
    pub parallel: u16,

    /// Max keys per listing request (1-1000). Default: 1000.
    #[arg(long, env = "S3_REINVOKE_LAMBDA_MAX_KEYS", default_value_t = DEFAULT_MAX_KEYS, help_heading = "Performance")]
    pub max_keys: i32,

    // -----------------------------------------------------------------------
    // Logging options
    // -----------------------------------------------------------------------
    /// Verbosity level. -q (quiet), default (info), -v, -vv.
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Output logs in JSON format.
    #[arg(long, env = "S3_REINVOKE_LAMBDA_JSON_TRACING", default_value_t = DEFAULT_JSON_TRACING, help_heading = "Logging")]
    pub json_tracing: bool,

    /// Enable AWS SDK tracing.
    #[arg(long, env = "S3_REINVOKE_LAMBDA_AWS_SDK_TRACING", default_value_t = DEFAULT_AWS_SDK_TRACING, help_heading = "Logging")]
    pub aws_sdk_tracing: bool,

    /// Enable tracing span events.
    #[arg(long, env = "S3_REINVOKE_LAMBDA_SPAN_EVENTS_TRACING", default_value_t = DEFAULT_SPAN_EVENTS_TRACING, help_heading = "Logging")]
    pub span_events_tracing: bool,

    /// Disable colored output in logs.
    #[arg(long, env = "S3_REINVOKE_LAMBDA_DISABLE_COLOR_TRACING", default_value_t = DEFAULT_DISABLE_COLOR_TRACING, help_heading = "Logging")]
    pub disable_color_tracing: bool,

    // -----------------------------------------------------------------------
    // Retry options
    // -----------------------------------------------------------------------
    /// Maximum attempts for AWS SDK operations. Default: 3.
    #[arg(long, env = "S3_REINVOKE_LAMBDA_AWS_MAX_ATTEMPTS", default_value_t = DEFAULT_AWS_MAX_ATTEMPTS, help_heading = "Retry")]
    pub aws_max_attempts: u32,

    /// Initial backoff in milliseconds for SDK retries. Default: 100.
    #[arg(long, env = "S3_REINVOKE_LAMBDA_INITIAL_BACKOFF_MILLISECONDS", default_value_t = DEFAULT_INITIAL_BACKOFF_MILLISECONDS, help_heading = "Retry")]
    pub initial_backoff_milliseconds: u64,

    // -----------------------------------------------------------------------
    // Timeout options
    // -----------------------------------------------------------------------
    /// Overall operation timeout in milliseconds.
    #[arg(long, env = "S3_REINVOKE_LAMBDA_OPERATION_TIMEOUT_MILLISECONDS", help_heading = "Timeout")]
    pub operation_timeout_milliseconds: Option<u64>,

    /// Per-attempt operation timeout in milliseconds.
    #[arg(long, env = "S3_REINVOKE_LAMBDA_OPERATION_ATTEMPT_TIMEOUT_MILLISECONDS", help_heading = "Timeout")]
    pub operation_attempt_timeout_milliseconds: Option<u64>,

    /// Connection timeout in milliseconds.
    #[arg(long, env = "S3_REINVOKE_LAMBDA_CONNECT_TIMEOUT_MILLISECONDS", help_heading = "Timeout")]
    pub connect_timeout_milliseconds: Option<u64>,

    /// Read timeout in milliseconds.
    #[arg(long, env = "S3_REINVOKE_LAMBDA_READ_TIMEOUT_MILLISECONDS", help_heading = "Timeout")]
    pub read_timeout_milliseconds: Option<u64>,

    // -----------------------------------------------------------------------
    // AWS configuration
    // -----------------------------------------------------------------------
    /// AWS config file path.
    #[arg(long, env, help_heading = "AWS")]
    pub aws_config_file: Option<PathBuf>,

    /// AWS shared credentials file path.
    #[arg(long, env, help_heading = "AWS")]
    pub aws_shared_credentials_file: Option<PathBuf>,

    /// AWS profile. If not set, the default credential chain is used.
    #[arg(long, value_parser = NonEmptyStringValueParser::new(), conflicts_with_all = ["access_key"], help_heading = "AWS")]
    pub profile: Option<String>,

    /// AWS access key ID.
    #[arg(long, value_parser = NonEmptyStringValueParser::new(), requires = "secret_access_key", help_heading = "AWS")]
    pub access_key: Option<String>,

    /// AWS secret access key.
    #[arg(long, value_parser = NonEmptyStringValueParser::new(), requires = "access_key", help_heading = "AWS")]
    pub secret_access_key: Option<String>,

    /// AWS session token.
    #[arg(long, value_parser = NonEmptyStringValueParser::new(), requires = "access_key", help_heading = "AWS")]
    pub session_token: Option<String>,

    /// AWS region. Also used as the awsRegion of the synthetic event.
    #[arg(long, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub region: Option<String>,

    /// Custom S3-compatible endpoint URL.
    #[arg(long, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub endpoint_url: Option<String>,

    /// Custom Lambda endpoint URL.
    #[arg(long, env = "S3_REINVOKE_LAMBDA_LAMBDA_ENDPOINT_URL", value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub lambda_endpoint_url: Option<String>,

    /// Force path-style access to S3.
    #[arg(long, env = "S3_REINVOKE_LAMBDA_FORCE_PATH_STYLE", default_value_t = DEFAULT_FORCE_PATH_STYLE, help_heading = "AWS")]
    pub force_path_style: bool,

    /// Disable stalled stream protection.
    #[arg(long, env = "S3_REINVOKE_LAMBDA_DISABLE_STALLED_STREAM_PROTECTION", default_value_t = DEFAULT_DISABLE_STALLED_STREAM_PROTECTION, help_heading = "AWS")]
    pub disable_stalled_stream_protection: bool,

    // -----------------------------------------------------------------------
    // Advanced options
    // -----------------------------------------------------------------------
    /// Generate shell completions.
    #[arg(long, env = "S3_REINVOKE_LAMBDA_AUTO_COMPLETE_SHELL", help_heading = "Advanced")]
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
}

// ---------------------------------------------------------------------------
// parse_from_args (public API)
// ---------------------------------------------------------------------------

/// Parse command-line arguments into a `CLIArgs` struct.
///
/// # Example
///
/// ```
/// use s3_reinvoke_lambda::config::args::parse_from_args;
///
/// let args = vec!["s3-reinvoke-lambda", "my-bucket", "my-function", "--dry-run"];
/// let cli_args = parse_from_args(args).unwrap();
/// assert!(cli_args.dry_run);
/// ```
pub fn parse_from_args<I, T>(args: I) -> Result<CLIArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    CLIArgs::try_parse_from(args)
}

/// Parse arguments and build a Config in one step.
pub fn build_config_from_args<I, T>(args: I) -> Result<Config, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli_args = CLIArgs::try_parse_from(args).map_err(|e| e.to_string())?;
    Config::try_from(cli_args)
}

// ---------------------------------------------------------------------------
// Validation and Config conversion
// ---------------------------------------------------------------------------

impl CLIArgs {
    fn validate(&self) -> Result<(), String> {
        if self.parallel == 0 {
            return Err(ERROR_MESSAGE_PARALLEL_ZERO.to_string());
        }
        if !(1..=MAX_KEYS_UPPER_BOUND).contains(&self.max_keys) {
            return Err(ERROR_MESSAGE_MAX_KEYS_OUT_OF_RANGE.to_string());
        }
        if self.auto_complete_shell.is_none() {
            if self.bucket.is_empty() {
                return Err(ERROR_MESSAGE_EMPTY_BUCKET.to_string());
            }
            if self.function_name.is_empty() {
                return Err(ERROR_MESSAGE_EMPTY_FUNCTION_NAME.to_string());
            }
        }
        Ok(())
    }

    fn build_filter_config(&self) -> Result<FilterConfig, String> {
        let before_time = self
            .modified_before
            .as_deref()
            .map(parse_modified_before)
            .transpose()?;

        let mut lower_extensions = self.ext.clone();
        lower_extensions.sort();
        lower_extensions.dedup();

        Ok(FilterConfig {
            before_time,
            lower_extensions,
        })
    }

    fn build_client_config(&self) -> ClientConfig {
        let credential = if let Some(ref profile) = self.profile {
            S3Credentials::Profile(profile.clone())
        } else if let Some(ref access_key) = self.access_key {
            S3Credentials::Credentials {
                access_keys: AccessKeys {
                    access_key: access_key.clone(),
                    secret_access_key: self.secret_access_key.clone().unwrap_or_default(),
                    session_token: self.session_token.clone(),
                },
            }
        } else {
            S3Credentials::FromEnvironment
        };

        ClientConfig {
            client_config_location: ClientConfigLocation {
                aws_config_file: self.aws_config_file.clone(),
                aws_shared_credentials_file: self.aws_shared_credentials_file.clone(),
            },
            credential,
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            lambda_endpoint_url: self.lambda_endpoint_url.clone(),
            force_path_style: self.force_path_style,
            retry_config: RetryConfig {
                aws_max_attempts: self.aws_max_attempts,
                initial_backoff_milliseconds: self.initial_backoff_milliseconds,
            },
            cli_timeout_config: CLITimeoutConfig {
                operation_timeout_milliseconds: self.operation_timeout_milliseconds,
                operation_attempt_timeout_milliseconds: self.operation_attempt_timeout_milliseconds,
                connect_timeout_milliseconds: self.connect_timeout_milliseconds,
                read_timeout_milliseconds: self.read_timeout_milliseconds,
            },
            disable_stalled_stream_protection: self.disable_stalled_stream_protection,
        }
    }

    fn build_tracing_config(&self) -> Option<TracingConfig> {
        let log_level = self.verbosity.log_level()?;

        Some(TracingConfig {
            tracing_level: log_level,
            json_tracing: self.json_tracing,
            aws_sdk_tracing: self.aws_sdk_tracing,
            span_events_tracing: self.span_events_tracing,
            disable_color_tracing: self.disable_color_tracing,
        })
    }
}

impl TryFrom<CLIArgs> for Config {
    type Error = String;

    fn try_from(args: CLIArgs) -> Result<Self, Self::Error> {
        args.validate()?;

        let filter_config = args.build_filter_config()?;
        let client_config = args.build_client_config();
        let tracing_config = args.build_tracing_config();

        Ok(Config {
            bucket: args.bucket,
            prefix: args.prefix,
            start_after: args.start_after,
            function_name: args.function_name,
            filter_config,
            max_concurrency: args.parallel,
            dry_run: args.dry_run,
            max_keys: args.max_keys,
            show_no_progress: args.show_no_progress,
            client_config: Some(client_config),
            tracing_config,
            auto_complete_shell: args.auto_complete_shell,
        })
    }
}
