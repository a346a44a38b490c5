//! Bounded fan-out of invocation units.
//!
//! The coordinator hands each filtered object to [`Dispatcher::dispatch`],
//! which waits for an admission slot and spawns one [`InvocationUnit`] that
//! owns both the object and the slot. Units run concurrently and report
//! their outcome to the shared [`InvocationStatsReport`] exactly once.

use anyhow::anyhow;
use async_channel::Sender;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info};

use crate::gate::{AdmissionGate, AdmissionPermit};
use crate::invoker::Invoker;
use crate::types::error::S3ReinvokeError;
use crate::types::token::PipelineCancellationToken;
use crate::types::{InvocationStatistics, InvocationStatsReport, S3Object};

/// Builds the invocation payload for one object in `bucket`.
pub(crate) type PayloadBuilder = fn(Option<&str>, &str, &S3Object) -> anyhow::Result<Vec<u8>>;

/// Run-wide values every invocation unit reads.
pub(crate) struct InvocationContext {
    pub function_name: String,
    pub bucket: String,
    pub region: Option<String>,
    pub dry_run: bool,
    pub payload_builder: PayloadBuilder,
    pub invoker: Invoker,
    pub stats_report: Arc<InvocationStatsReport>,
    pub stats_sender: Sender<InvocationStatistics>,
}

impl InvocationContext {
    async fn send_stats(&self, stats: InvocationStatistics) {
        let _ = self.stats_sender.send(stats).await;
    }
}

/// Outcome of handing one object to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Admitted,
    Cancelled,
}

pub(crate) struct Dispatcher {
    context: Arc<InvocationContext>,
    gate: AdmissionGate,
    cancellation_token: PipelineCancellationToken,
    units: JoinSet<()>,
    errors: Vec<anyhow::Error>,
}

impl Dispatcher {
    pub fn new(
        context: InvocationContext,
        max_concurrency: usize,
        cancellation_token: PipelineCancellationToken,
    ) -> Self {
        Self {
            context: Arc::new(context),
            gate: AdmissionGate::new(max_concurrency),
            cancellation_token,
            units: JoinSet::new(),
            errors: Vec::new(),
        }
    }

    /// Wait for a free slot and launch one invocation unit for `object`.
    ///
    /// The object is counted in `total` once admitted. Returns
    /// [`Admission::Cancelled`] without counting or launching anything when
    /// the cancellation token fires first.
    pub async fn dispatch(&mut self, object: S3Object) -> Admission {
        let Some(permit) = self.gate.acquire_or_cancel(&self.cancellation_token).await else {
            debug!(key = object.key(), "dispatch has been cancelled.");
            return Admission::Cancelled;
        };

        self.context.stats_report.increment_total();
        let unit = InvocationUnit {
            context: self.context.clone(),
            object,
        };
        self.units.spawn(unit.run(permit));

        while let Some(join_result) = self.units.try_join_next() {
            self.handle_join_result(join_result);
        }

        Admission::Admitted
    }

    /// Wait for every launched unit to finish.
    pub async fn drain(&mut self) {
        debug!(in_flight = self.units.len(), "waiting for in-flight invocations.");

        while let Some(join_result) = self.units.join_next().await {
            self.handle_join_result(join_result);
        }
    }

    /// Errors of units that panicked, in the order they were joined.
    pub fn take_errors(&mut self) -> Vec<anyhow::Error> {
        std::mem::take(&mut self.errors)
    }

    #[cfg(test)]
    pub fn in_flight(&self) -> usize {
        self.gate.in_use()
    }

    fn handle_join_result(&mut self, join_result: Result<(), JoinError>) {
        if let Err(e) = join_result {
            // The unit never reached its own accounting.
            self.context.stats_report.increment_errored();
            error!(error = e.to_string(), "invocation task panicked.");
            self.errors.push(anyhow!(S3ReinvokeError::Pipeline(format!(
                "invocation task panicked: {e}"
            ))));
        }
    }
}

/// One object's build / invoke / account sequence.
struct InvocationUnit {
    context: Arc<InvocationContext>,
    object: S3Object,
}

impl InvocationUnit {
    async fn run(self, _permit: AdmissionPermit) {
        let context = &self.context;
        let key = self.object.key();

        let payload =
            match (context.payload_builder)(context.region.as_deref(), &context.bucket, &self.object)
            {
                Ok(payload) => payload,
                Err(e) => {
                    context.stats_report.increment_errored();
                    error!(key = key, error = format!("{e:#}"), "failed to build S3 event payload.");
                    context
                        .send_stats(InvocationStatistics::InvokeError {
                            key: key.to_string(),
                        })
                        .await;
                    return;
                }
            };

        if context.dry_run {
            context.stats_report.increment_completed();
            info!(
                key = key,
                size = self.object.size,
                function_name = context.function_name,
                "[dry-run] invocation completed."
            );
            context
                .send_stats(InvocationStatistics::InvokeComplete {
                    key: key.to_string(),
                })
                .await;
            return;
        }

        let start = Instant::now();
        match context
            .invoker
            .invoke(&context.function_name, payload)
            .await
        {
            Ok(()) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                context.stats_report.increment_completed();
                context.stats_report.add_duration_ms(duration_ms);
                info!(
                    key = key,
                    size = self.object.size,
                    function_name = context.function_name,
                    duration_ms = duration_ms,
                    "invocation completed."
                );
                context
                    .send_stats(InvocationStatistics::InvokeComplete {
                        key: key.to_string(),
                    })
                    .await;
            }
            Err(e) => {
                context.stats_report.increment_errored();
                error!(
                    key = key,
                    function_name = context.function_name,
                    error = format!("{e:#}"),
                    "invocation failed."
                );
                context
                    .send_stats(InvocationStatistics::InvokeError {
                        key: key.to_string(),
                    })
                    .await;
            }
        }
    }
}
