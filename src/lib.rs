/*!
# Overview
s3-reinvoke-lambda re-invokes an AWS Lambda function for objects that
already exist in an Amazon S3 bucket.

For every listed object that passes the filters, a synthetic
`ObjectCreated:Put` S3 event is built and sent to the function, exactly as
if the object had just been uploaded. Typical use: re-running an S3-triggered
function over a backlog after fixing a bug in it.

## Features
- **Bounded Concurrency**: At most `--parallel` invocations in flight
- **Filtering**: Key prefix, start-after key, extension allow-list, modified-before cutoff
- **Dry Run**: Lists, filters and builds payloads without invoking
- **Graceful Cancellation**: Ctrl-C stops new work and waits for in-flight invocations
- **Library-First**: The CLI is a thin wrapper over this library

## As a Library

```toml
[dependencies]
s3-reinvoke-lambda = "0.1"
tokio = { version = "1", features = ["full"] }
```

```no_run
use s3_reinvoke_lambda::config::args::parse_from_args;
use s3_reinvoke_lambda::{Config, ReinvokePipeline, create_pipeline_cancellation_token};

#[tokio::main]
async fn main() {
    let args = vec![
        "s3-reinvoke-lambda",
        "my-bucket",
        "my-function",
        "--prefix",
        "images/",
        "--ext",
        ".jpg",
        "--dry-run",
    ];

    let parsed_args = parse_from_args(args).unwrap();
    let config = Config::try_from(parsed_args).unwrap();
    let cancellation_token = create_pipeline_cancellation_token();
    let mut pipeline = ReinvokePipeline::new(config, cancellation_token).await.unwrap();
    pipeline.close_stats_sender();
    pipeline.run().await;

    let summary = pipeline.get_summary();
    println!(
        "total={} completed={} skipped={} errored={}",
        summary.total, summary.completed, summary.skipped, summary.errored
    );

    if pipeline.has_error() {
        eprintln!("{:?}", pipeline.get_errors_and_consume().unwrap()[0]);
    }
}
```
*/

#![allow(clippy::collapsible_if)]

pub mod config;
pub mod event;
pub mod filters;
pub mod gate;
pub mod invoker;
pub mod lister;
pub mod pipeline;
pub mod storage;
pub mod types;

mod dispatcher;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::Config;
pub use config::args::CLIArgs;
pub use event::build_s3_event_payload;
pub use invoker::{Invoker, InvokerTrait};
pub use pipeline::ReinvokePipeline;
pub use storage::{Storage, StorageTrait};
pub use types::error::{S3ReinvokeError, exit_code_from_error};
pub use types::token::{PipelineCancellationToken, create_pipeline_cancellation_token};
pub use types::{InvocationStatistics, ListingPage, RunSummary, S3Object};
