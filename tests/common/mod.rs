//! Shared test infrastructure for the integration tests.
//!
//! Provides scripted [`StorageTrait`] and recording [`InvokerTrait`]
//! implementations built only on the public API, plus a helper that runs a
//! pipeline to completion and collects its outcome.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use s3_reinvoke_lambda::event::S3Event;
use s3_reinvoke_lambda::{
    Config, InvocationStatistics, InvokerTrait, ListingPage, PipelineCancellationToken,
    ReinvokePipeline, RunSummary, S3Object, S3ReinvokeError, StorageTrait,
};

pub const TEST_TIMEOUT: Duration = Duration::from_secs(30);

#[macro_export]
macro_rules! test_timeout {
    ($body:expr) => {
        tokio::time::timeout(common::TEST_TIMEOUT, $body)
            .await
            .expect("test timed out")
    };
}

pub fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

pub fn object(key: &str, last_modified: DateTime<Utc>) -> S3Object {
    S3Object::new(key)
        .with_size(2048)
        .with_e_tag(format!("\"etag-{key}\""))
        .with_last_modified(last_modified)
}

pub fn page(objects: Vec<S3Object>, next_continuation_token: Option<&str>) -> ListingPage {
    ListingPage {
        objects,
        is_truncated: next_continuation_token.is_some(),
        next_continuation_token: next_continuation_token.map(String::from),
    }
}

/// The two-page bucket used by most scenarios.
///
/// Page 1: `1.jpg` (old), `2.txt` (old), `3.png` (old), `new.jpg` (new).
/// Page 2: `4.jpg` (old), `error.jpg` (old).
pub fn two_page_bucket() -> Vec<Result<ListingPage, String>> {
    let old = utc(2024, 6, 19);
    let new = utc(2024, 6, 21);
    vec![
        Ok(page(
            vec![
                object("my-prefix/1.jpg", old),
                object("my-prefix/2.txt", old),
                object("my-prefix/3.png", old),
                object("my-prefix/new.jpg", new),
            ],
            Some("my-continuation-token"),
        )),
        Ok(page(
            vec![
                object("my-prefix/4.jpg", old),
                object("my-prefix/error.jpg", old),
            ],
            None,
        )),
    ]
}

/// Config matching [`two_page_bucket`]: `.jpg`/`.png` modified before
/// 2024-06-20.
pub fn two_page_config() -> Config {
    let mut config = Config::for_target("my-bucket", "my-function");
    config.prefix = "my-prefix/".to_string();
    config.max_concurrency = 2;
    config.filter_config.lower_extensions = vec![".jpg".to_string(), ".png".to_string()];
    config.filter_config.before_time = Some(utc(2024, 6, 20));
    config
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedListing {
    pub prefix: String,
    pub start_after: Option<String>,
    pub continuation_token: Option<String>,
}

/// Storage serving canned pages in request order.
#[derive(Clone)]
pub struct ScriptedStorage {
    pages: Arc<Vec<Result<ListingPage, String>>>,
    requests: Arc<Mutex<Vec<RecordedListing>>>,
    cancel_after_call: Option<(usize, PipelineCancellationToken)>,
}

impl ScriptedStorage {
    pub fn new(pages: Vec<Result<ListingPage, String>>) -> Self {
        Self {
            pages: Arc::new(pages),
            requests: Arc::new(Mutex::new(Vec::new())),
            cancel_after_call: None,
        }
    }

    /// Cancel `token` while serving the `call_index`-th request (0-based).
    pub fn cancel_after_call(mut self, call_index: usize, token: PipelineCancellationToken) -> Self {
        self.cancel_after_call = Some((call_index, token));
        self
    }

    pub fn requests(&self) -> Vec<RecordedListing> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageTrait for ScriptedStorage {
    fn bucket(&self) -> &str {
        "my-bucket"
    }

    fn region(&self) -> Option<String> {
        Some("ap-northeast-1".to_string())
    }

    async fn list_objects_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        continuation_token: Option<String>,
        _max_keys: i32,
    ) -> Result<ListingPage> {
        let call_index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(RecordedListing {
                prefix: prefix.to_string(),
                start_after: start_after.map(String::from),
                continuation_token,
            });
            requests.len() - 1
        };

        if let Some((index, token)) = &self.cancel_after_call {
            if *index == call_index {
                token.cancel();
            }
        }

        match self.pages.get(call_index) {
            Some(Ok(page)) => Ok(page.clone()),
            Some(Err(message)) => Err(anyhow!(S3ReinvokeError::Listing(message.clone()))),
            None => Err(anyhow!(S3ReinvokeError::Listing(
                "no more scripted pages".to_string()
            ))),
        }
    }
}

/// Invoker recording every payload it receives.
#[derive(Clone, Default)]
pub struct RecordingInvoker {
    failing_keys: Arc<HashSet<String>>,
    delay: Duration,
    events: Arc<Mutex<Vec<S3Event>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl RecordingInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, keys: &[&str]) -> Self {
        self.failing_keys = Arc::new(keys.iter().map(|k| k.to_string()).collect());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn events(&self) -> Vec<S3Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn invoked_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .events()
            .iter()
            .map(|event| event.records[0].s3.object.key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InvokerTrait for RecordingInvoker {
    async fn invoke(&self, function_name: &str, payload: Vec<u8>) -> Result<()> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let event: S3Event = serde_json::from_slice(&payload)?;
        let key = event.records[0].s3.object.key.clone();
        self.events.lock().unwrap().push(event);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_keys.contains(&key) {
            return Err(anyhow!(S3ReinvokeError::Invocation {
                function_name: function_name.to_string(),
                message: "Unhandled".to_string(),
            }));
        }
        Ok(())
    }
}

/// Outcome of a pipeline run.
#[derive(Debug)]
pub struct PipelineResult {
    pub summary: RunSummary,
    pub has_error: bool,
    pub errors: Vec<String>,
    pub stats: Vec<InvocationStatistics>,
}

/// Run a pipeline built from the given parts and collect everything it
/// reports.
pub async fn run_pipeline(
    config: Config,
    storage: ScriptedStorage,
    invoker: RecordingInvoker,
    cancellation_token: PipelineCancellationToken,
) -> PipelineResult {
    let mut pipeline = ReinvokePipeline::with_components(
        config,
        Box::new(storage),
        Box::new(invoker),
        cancellation_token,
    );
    let receiver = pipeline.get_stats_receiver();

    pipeline.run().await;

    let mut stats = Vec::new();
    while let Ok(stat) = receiver.try_recv() {
        stats.push(stat);
    }

    PipelineResult {
        summary: pipeline.get_summary(),
        has_error: pipeline.has_error(),
        errors: pipeline.get_error_messages().unwrap_or_default(),
        stats,
    }
}
