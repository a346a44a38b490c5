use anyhow::Result;
use async_trait::async_trait;
use dyn_clone::DynClone;

pub mod lambda;

pub use lambda::LambdaInvoker;

/// Type alias for a boxed Invoker trait object.
pub type Invoker = Box<dyn InvokerTrait + Send + Sync>;

/// Remote-invocation capability used by the dispatcher.
///
/// `invoke` returns `Ok(())` only when the function ran successfully; any
/// transport, service or function error is an `Err`.
#[async_trait]
pub trait InvokerTrait: DynClone {
    async fn invoke(&self, function_name: &str, payload: Vec<u8>) -> Result<()>;
}

dyn_clone::clone_trait_object!(InvokerTrait);

/// Create the Lambda invoker from an already-built client.
pub fn create_invoker(client: aws_sdk_lambda::Client) -> Invoker {
    Box::new(LambdaInvoker::new(client))
}
