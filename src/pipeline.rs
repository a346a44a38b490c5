//! Re-invocation pipeline orchestrator.
//!
//! One coordinating flow lists the bucket page by page, runs every object
//! through the filter chain and hands the survivors to the bounded
//! dispatcher:
//!
//! ```text
//! ObjectLister → FilterChain → Dispatcher → [InvocationUnit × max_concurrency]
//! ```
//!
//! Pagination is sequential. Invocation units run concurrently and feed the
//! shared statistics report; the run returns only after every launched unit
//! has finished.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Result, anyhow};
use async_channel::{Receiver, Sender};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::dispatcher::{Admission, Dispatcher, InvocationContext};
use crate::event::build_s3_event_payload;
use crate::filters::FilterChain;
use crate::invoker::{self, Invoker};
use crate::lister::ObjectLister;
use crate::storage::{self, Storage};
use crate::types::error::S3ReinvokeError;
use crate::types::token::PipelineCancellationToken;
use crate::types::{
    InvocationStatistics, InvocationStatsReport, ListingPage, RunSummary, S3Object,
};

const MAX_KEYS_UPPER_BOUND: i32 = 1000;

/// The re-invocation pipeline.
///
/// ## Usage
///
/// ```no_run
/// # async fn example() -> anyhow::Result<()> {
/// use s3_reinvoke_lambda::{Config, ReinvokePipeline, create_pipeline_cancellation_token};
///
/// let mut config = Config::for_target("my-bucket", "my-function");
/// config.dry_run = true;
///
/// let cancellation_token = create_pipeline_cancellation_token();
/// let mut pipeline = ReinvokePipeline::new(config, cancellation_token).await?;
/// pipeline.close_stats_sender();
/// pipeline.run().await;
///
/// let summary = pipeline.get_summary();
/// println!("completed {} of {}", summary.completed, summary.total);
/// if pipeline.has_error() {
///     eprintln!("{:?}", pipeline.get_errors_and_consume().unwrap()[0]);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ReinvokePipeline {
    config: Config,
    storage: Storage,
    invoker: Invoker,
    cancellation_token: PipelineCancellationToken,
    stats_sender: Sender<InvocationStatistics>,
    stats_receiver: Receiver<InvocationStatistics>,
    has_error: Arc<AtomicBool>,
    errors: Arc<Mutex<VecDeque<anyhow::Error>>>,
    ready: bool,
    stats_report: Arc<InvocationStatsReport>,
}

#[derive(Debug, PartialEq, Eq)]
enum PageOutcome {
    Continue,
    Cancelled,
}

impl ReinvokePipeline {
    /// Create a pipeline backed by S3 and Lambda.
    ///
    /// Resolves the AWS configuration from `config.client_config` (or the
    /// environment when it is `None`). Fails when no region can be resolved.
    pub async fn new(config: Config, cancellation_token: PipelineCancellationToken) -> Result<Self> {
        let client_config = config.client_config.clone().unwrap_or_default();
        let clients = client_config.create_clients().await?;

        let storage = storage::create_storage(
            &config.bucket,
            clients.s3_client.clone(),
            clients.region(),
        );
        let invoker = invoker::create_invoker(clients.lambda_client.clone());

        Ok(Self::with_components(
            config,
            storage,
            invoker,
            cancellation_token,
        ))
    }

    /// Create a pipeline with caller-supplied listing and invocation
    /// capabilities.
    pub fn with_components(
        config: Config,
        storage: Storage,
        invoker: Invoker,
        cancellation_token: PipelineCancellationToken,
    ) -> Self {
        let (stats_sender, stats_receiver) = async_channel::unbounded();

        Self {
            config,
            storage,
            invoker,
            cancellation_token,
            stats_sender,
            stats_receiver,
            has_error: Arc::new(AtomicBool::new(false)),
            errors: Arc::new(Mutex::new(VecDeque::new())),
            ready: true,
            stats_report: Arc::new(InvocationStatsReport::new()),
        }
    }

    /// Run the pipeline to completion.
    ///
    /// Listing failures and invalid configuration are recorded as errors
    /// (see [`has_error`](Self::has_error)); per-object failures are only
    /// counted in the summary. Cancellation stops new pages and new
    /// invocations; units already launched are awaited.
    ///
    /// # Panics
    ///
    /// Panics if called more than once.
    pub async fn run(&mut self) {
        assert!(self.ready, "ReinvokePipeline::run() called more than once");
        self.ready = false;

        if let Err(e) = self.validate_config() {
            error!(error = e.to_string(), "invalid configuration.");
            self.record_error(e);
            self.shutdown();
            return;
        }

        info!(
            bucket = self.config.bucket,
            prefix = self.config.prefix,
            start_after = self.config.start_after,
            function_name = self.config.function_name,
            max_concurrency = self.config.max_concurrency,
            dry_run = self.config.dry_run,
            "re-invocation has started."
        );

        let start = Instant::now();
        self.execute_pipeline().await;

        if self.cancellation_token.is_cancelled() {
            info!("re-invocation has been cancelled.");
        }

        let summary = self.get_summary();
        info!(
            total = summary.total,
            completed = summary.completed,
            skipped = summary.skipped,
            errored = summary.errored,
            invocation_duration_ms = summary.duration_ms,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "re-invocation summary."
        );

        self.shutdown();
    }

    /// Check if any error occurred during the pipeline execution.
    pub fn has_error(&self) -> bool {
        self.has_error.load(Ordering::SeqCst)
    }

    /// Consume and return all accumulated errors.
    ///
    /// Returns `None` if no errors occurred.
    pub fn get_errors_and_consume(&self) -> Option<Vec<anyhow::Error>> {
        if !self.has_error() {
            return None;
        }
        let mut error_list = self.errors.lock().unwrap();
        Some(error_list.drain(..).collect())
    }

    /// Get error messages without consuming them.
    ///
    /// Returns `None` if no errors occurred.
    pub fn get_error_messages(&self) -> Option<Vec<String>> {
        if !self.has_error() {
            return None;
        }
        let error_list = self.errors.lock().unwrap();
        Some(error_list.iter().map(|e| e.to_string()).collect())
    }

    /// Snapshot of the counters. Consistent once [`run`](Self::run) has
    /// returned, including after a listing failure or cancellation.
    pub fn get_summary(&self) -> RunSummary {
        self.stats_report.snapshot()
    }

    /// Get the stats receiver for progress reporting.
    pub fn get_stats_receiver(&self) -> Receiver<InvocationStatistics> {
        self.stats_receiver.clone()
    }

    /// Close the stats sender to signal the progress reporter to finish.
    ///
    /// Call this before `run()` if you don't need progress reporting.
    pub fn close_stats_sender(&self) {
        self.stats_sender.close();
    }

    // -----------------------------------------------------------------------
    // Internal methods
    // -----------------------------------------------------------------------

    fn validate_config(&self) -> Result<()> {
        if self.config.max_concurrency == 0 {
            return Err(anyhow!(S3ReinvokeError::InvalidConfig(
                "max_concurrency must be at least 1".to_string()
            )));
        }
        if !(1..=MAX_KEYS_UPPER_BOUND).contains(&self.config.max_keys) {
            return Err(anyhow!(S3ReinvokeError::InvalidConfig(format!(
                "max_keys must be between 1 and {MAX_KEYS_UPPER_BOUND}"
            ))));
        }
        if self.config.function_name.is_empty() {
            return Err(anyhow!(S3ReinvokeError::InvalidConfig(
                "function name must not be empty".to_string()
            )));
        }
        Ok(())
    }

    async fn execute_pipeline(&self) {
        let context = InvocationContext {
            function_name: self.config.function_name.clone(),
            bucket: self.storage.bucket().to_string(),
            region: self.storage.region(),
            dry_run: self.config.dry_run,
            payload_builder: build_s3_event_payload,
            invoker: self.invoker.clone(),
            stats_report: self.stats_report.clone(),
            stats_sender: self.stats_sender.clone(),
        };
        let mut dispatcher = Dispatcher::new(
            context,
            self.config.max_concurrency as usize,
            self.cancellation_token.clone(),
        );
        let mut lister = ObjectLister::new(
            self.storage.clone(),
            &self.config.prefix,
            &self.config.start_after,
            self.config.max_keys,
        );
        let filter_chain = FilterChain::new(self.config.filter_config.clone());

        while self.should_continue() {
            match lister.next_page().await {
                Ok(Some(page)) => {
                    if self.process_page(page, &filter_chain, &mut dispatcher).await
                        == PageOutcome::Cancelled
                    {
                        break;
                    }
                }
                Ok(None) => {
                    debug!(pages = lister.pages_fetched(), "listing has been completed.");
                    break;
                }
                Err(e) => {
                    error!(error = format!("{e:#}"), "object listing failed.");
                    self.record_error(e);
                    break;
                }
            }
        }

        dispatcher.drain().await;
        for e in dispatcher.take_errors() {
            self.record_error(e);
        }
    }

    async fn process_page(
        &self,
        page: ListingPage,
        filter_chain: &FilterChain,
        dispatcher: &mut Dispatcher,
    ) -> PageOutcome {
        for object in page.objects {
            if !self.should_continue() {
                return PageOutcome::Cancelled;
            }

            if !filter_chain.is_target(&object) {
                self.skip(object).await;
                continue;
            }

            if dispatcher.dispatch(object).await == Admission::Cancelled {
                return PageOutcome::Cancelled;
            }
        }

        PageOutcome::Continue
    }

    async fn skip(&self, object: S3Object) {
        self.stats_report.increment_total();
        self.stats_report.increment_skipped();
        info!(key = object.key(), "skipped by filter.");

        let _ = self
            .stats_sender
            .send(InvocationStatistics::InvokeSkip { key: object.key })
            .await;
    }

    fn should_continue(&self) -> bool {
        !self.cancellation_token.is_cancelled()
    }

    fn record_error(&self, error: anyhow::Error) {
        self.has_error.store(true, Ordering::SeqCst);
        self.errors.lock().unwrap().push_back(error);
    }

    fn shutdown(&self) {
        self.close_stats_sender();
    }
}
