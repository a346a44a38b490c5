use anyhow::Error;
use aws_sdk_s3::error::SdkError;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use thiserror::Error;

/// Application-level error types for s3-reinvoke-lambda.
///
/// Fatal variants abort the run; per-object variants (`PayloadBuild`,
/// `Invocation`) are absorbed into the run summary and only ever logged.
/// A cancelled run is not an error.
#[derive(Error, Debug, PartialEq)]
pub enum S3ReinvokeError {
    /// Invalid command-line or library configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// AWS configuration or credential resolution failed.
    #[error("AWS client configuration error: {0}")]
    ClientConfig(String),

    /// ListObjectsV2 failed. Aborts the run.
    #[error("Failed to list objects: {0}")]
    Listing(String),

    /// The synthetic S3 event could not be serialized.
    #[error("Failed to build S3 event payload for key {key}: {message}")]
    PayloadBuild { key: String, message: String },

    /// The Lambda function could not be invoked or returned a function error.
    #[error("Failed to invoke function {function_name}: {message}")]
    Invocation {
        function_name: String,
        message: String,
    },

    /// An invocation task panicked.
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

const EXIT_CODE_ERROR: i32 = 1;

impl S3ReinvokeError {
    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        EXIT_CODE_ERROR
    }
}

/// Extract the exit code from an anyhow::Error, defaulting to 1.
pub fn exit_code_from_error(e: &Error) -> i32 {
    if let Some(err) = e.downcast_ref::<S3ReinvokeError>() {
        return err.exit_code();
    }
    EXIT_CODE_ERROR
}

/// Extracts the service error code and message from an AWS SDK error.
///
/// For service errors, returns the error code (e.g. "AccessDenied",
/// "ResourceNotFoundException") and the human-readable message from the
/// response. For other error types (network, timeout, construction failure),
/// returns "N/A" as the code and the full error description as the message.
pub(crate) fn extract_sdk_error_details<E: std::fmt::Display + ProvideErrorMetadata, R>(
    e: &SdkError<E, R>,
) -> (String, String) {
    if let Some(service_err) = e.as_service_error() {
        (
            service_err.code().unwrap_or("unknown").to_string(),
            service_err.message().unwrap_or("no message").to_string(),
        )
    } else {
        ("N/A".to_string(), e.to_string())
    }
}
