use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_lambda::Client;
use aws_sdk_lambda::operation::invoke::InvokeOutput;
use aws_sdk_lambda::types::InvocationType;
use std::sync::Arc;
use tracing::trace;

use crate::invoker::InvokerTrait;
use crate::types::error::{S3ReinvokeError, extract_sdk_error_details};

/// Synchronous (`RequestResponse`) Lambda invoker.
///
/// The call returns after the function finishes, so the measured duration
/// covers the function's own execution time.
#[derive(Clone)]
pub struct LambdaInvoker {
    client: Arc<Client>,
}

impl LambdaInvoker {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl InvokerTrait for LambdaInvoker {
    async fn invoke(&self, function_name: &str, payload: Vec<u8>) -> Result<()> {
        let output = self
            .client
            .invoke()
            .function_name(function_name)
            .invocation_type(InvocationType::RequestResponse)
            .set_payload(Some(payload.into()))
            .send()
            .await
            .map_err(|e| {
                let (error_code, error_message) = extract_sdk_error_details(&e);
                anyhow!(S3ReinvokeError::Invocation {
                    function_name: function_name.to_string(),
                    message: format!("{error_code} ({error_message})"),
                })
                .context("aws_sdk_lambda::client::invoke() failed.")
            })?;

        check_invoke_output(function_name, &output)
    }
}

/// A successful Invoke call can still carry a function error (`Unhandled`
/// or `Handled`); that counts as a failed invocation.
fn check_invoke_output(function_name: &str, output: &InvokeOutput) -> Result<()> {
    trace!(
        function_name = function_name,
        status_code = output.status_code(),
        executed_version = output.executed_version(),
        "Lambda Invoke API call returned."
    );

    if let Some(function_error) = output.function_error() {
        let response = output
            .payload()
            .map(|payload| String::from_utf8_lossy(payload.as_ref()).to_string())
            .unwrap_or_default();

        return Err(anyhow!(S3ReinvokeError::Invocation {
            function_name: function_name.to_string(),
            message: format!("{function_error}: {response}"),
        }));
    }

    Ok(())
}
