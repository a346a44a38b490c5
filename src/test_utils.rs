//! Shared test utilities for the s3-reinvoke-lambda library crate.
//!
//! Provides the dummy tracing subscriber, canned configurations and mock
//! [`StorageTrait`] / [`InvokerTrait`] implementations used across the unit
//! tests.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::{ClientConfig, Config};
use crate::invoker::InvokerTrait;
use crate::storage::StorageTrait;
use crate::types::error::S3ReinvokeError;
use crate::types::token::PipelineCancellationToken;
use crate::types::{AccessKeys, ListingPage, S3Credentials, S3Object};

/// Initialise a dummy tracing subscriber for tests.
///
/// Uses `try_init` so that only the first call in a process actually
/// installs the subscriber; subsequent calls are silently ignored.
pub(crate) fn init_dummy_tracing_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("dummy=trace")
        .try_init();
}

/// In-memory log sink for asserting on emitted error lines.
#[derive(Clone, Default)]
pub(crate) struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Install an ERROR-level subscriber writing into this capture for the
    /// current thread until the guard is dropped.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::ERROR)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn error_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.lock().unwrap())
            .lines()
            .filter(|line| line.contains("ERROR"))
            .map(String::from)
            .collect()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Client configuration with static credentials and a local endpoint. No
/// request is ever sent with it.
pub(crate) fn make_test_client_config() -> ClientConfig {
    ClientConfig {
        credential: S3Credentials::Credentials {
            access_keys: AccessKeys {
                access_key: "test_key".to_string(),
                secret_access_key: "test_secret".to_string(),
                session_token: None,
            },
        },
        region: Some("us-east-1".to_string()),
        endpoint_url: Some("https://localhost:9000".to_string()),
        lambda_endpoint_url: Some("https://localhost:9001".to_string()),
        force_path_style: true,
        ..ClientConfig::default()
    }
}

/// Create a default [`Config`] suitable for most unit tests.
///
/// Key defaults: bucket=`"test-bucket"`, function=`"test-function"`,
/// `max_concurrency=4`.
pub(crate) fn make_test_config() -> Config {
    Config {
        max_concurrency: 4,
        ..Config::for_target("test-bucket", "test-function")
    }
}

pub(crate) fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

pub(crate) fn make_s3_object(key: &str, last_modified: DateTime<Utc>) -> S3Object {
    S3Object::new(key)
        .with_size(1024)
        .with_e_tag(format!("\"{key}\""))
        .with_last_modified(last_modified)
}

/// One recorded `list_objects_page` call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ListRequest {
    pub prefix: String,
    pub start_after: Option<String>,
    pub continuation_token: Option<String>,
    pub max_keys: i32,
}

/// Storage returning canned pages in order and recording every request.
///
/// An `Err` entry makes the corresponding call fail with a listing error.
/// Requests past the last entry fail as well.
#[derive(Clone)]
pub(crate) struct MockStorage {
    pages: Arc<Vec<std::result::Result<ListingPage, String>>>,
    requests: Arc<Mutex<Vec<ListRequest>>>,
    cancel_on_call: Option<(usize, PipelineCancellationToken)>,
}

impl MockStorage {
    pub fn new(pages: Vec<std::result::Result<ListingPage, String>>) -> Self {
        Self {
            pages: Arc::new(pages),
            requests: Arc::new(Mutex::new(Vec::new())),
            cancel_on_call: None,
        }
    }

    /// Cancel `token` while serving the `call_index`-th request (0-based).
    pub fn cancel_on_call(mut self, call_index: usize, token: PipelineCancellationToken) -> Self {
        self.cancel_on_call = Some((call_index, token));
        self
    }

    pub fn requests(&self) -> Vec<ListRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageTrait for MockStorage {
    fn bucket(&self) -> &str {
        "my-bucket"
    }

    fn region(&self) -> Option<String> {
        Some("us-east-1".to_string())
    }

    async fn list_objects_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        continuation_token: Option<String>,
        max_keys: i32,
    ) -> Result<ListingPage> {
        let call_index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(ListRequest {
                prefix: prefix.to_string(),
                start_after: start_after.map(String::from),
                continuation_token,
                max_keys,
            });
            requests.len() - 1
        };

        if let Some((cancel_index, token)) = &self.cancel_on_call {
            if *cancel_index == call_index {
                token.cancel();
            }
        }

        match self.pages.get(call_index) {
            Some(Ok(page)) => Ok(page.clone()),
            Some(Err(message)) => Err(anyhow!(S3ReinvokeError::Listing(message.clone()))),
            None => Err(anyhow!(S3ReinvokeError::Listing(
                "unexpected listing request".to_string()
            ))),
        }
    }
}

/// Invoker recording every call and tracking how many run at once.
#[derive(Clone, Default)]
pub(crate) struct MockInvoker {
    failing_keys: Arc<HashSet<String>>,
    panicking_keys: Arc<HashSet<String>>,
    delay: Duration,
    invoked_keys: Arc<Mutex<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_keys(mut self, keys: &[&str]) -> Self {
        self.failing_keys = Arc::new(keys.iter().map(|k| k.to_string()).collect());
        self
    }

    pub fn with_panicking_keys(mut self, keys: &[&str]) -> Self {
        self.panicking_keys = Arc::new(keys.iter().map(|k| k.to_string()).collect());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn invoked_keys(&self) -> Vec<String> {
        let mut keys = self.invoked_keys.lock().unwrap().clone();
        keys.sort();
        keys
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InvokerTrait for MockInvoker {
    async fn invoke(&self, function_name: &str, payload: Vec<u8>) -> Result<()> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let event: crate::event::S3Event = serde_json::from_slice(&payload)?;
        let key = event.records[0].s3.object.key.clone();
        self.invoked_keys.lock().unwrap().push(key.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panicking_keys.contains(&key) {
            panic!("invocation panicked for {key}");
        }
        if self.failing_keys.contains(&key) {
            return Err(anyhow!(S3ReinvokeError::Invocation {
                function_name: function_name.to_string(),
                message: format!("simulated failure for {key}"),
            }));
        }

        Ok(())
    }
}
