use std::fmt;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use aws_sdk_s3::types::Object;
use aws_smithy_types_convert::date_time::DateTimeExt;
use chrono::{DateTime, Utc};
use zeroize_derive::{Zeroize, ZeroizeOnDrop};

pub mod error;
pub mod token;

/// Descriptor of one listed S3 object.
///
/// Every attribute except the key is optional because ListObjectsV2 (and
/// S3-compatible services) may omit them.
#[derive(Debug, Clone, PartialEq)]
pub struct S3Object {
    pub key: String,
    pub size: Option<i64>,
    pub e_tag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl S3Object {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size: None,
            e_tag: None,
            last_modified: None,
        }
    }

    pub fn with_size(mut self, size: i64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_e_tag(mut self, e_tag: impl Into<String>) -> Self {
        self.e_tag = Some(e_tag.into());
        self
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Lowercased extension of the key including the leading dot, or an
    /// empty string when the last path segment has no dot.
    pub fn lower_extension(&self) -> String {
        let file_name = self.key.rsplit('/').next().unwrap_or_default();
        match file_name.rfind('.') {
            Some(idx) => file_name[idx..].to_lowercase(),
            None => String::new(),
        }
    }
}

impl From<&Object> for S3Object {
    fn from(object: &Object) -> Self {
        Self {
            key: object.key().unwrap_or_default().to_string(),
            size: object.size(),
            e_tag: object.e_tag().map(|e_tag| e_tag.to_string()),
            last_modified: object
                .last_modified()
                .and_then(|last_modified| last_modified.to_chrono_utc().ok()),
        }
    }
}

/// One page of a ListObjectsV2 listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    pub objects: Vec<S3Object>,
    pub is_truncated: bool,
    pub next_continuation_token: Option<String>,
}

/// Per-object outcomes sent through the stats channel while the run is in
/// progress. Consumed by the progress indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationStatistics {
    InvokeComplete { key: String },
    InvokeSkip { key: String },
    InvokeError { key: String },
}

/// Lock-free aggregator shared by every invocation unit.
///
/// Counters can only be incremented; read them through [`snapshot`](Self::snapshot)
/// once all units have been joined.
#[derive(Debug, Default)]
pub struct InvocationStatsReport {
    total: AtomicU64,
    completed: AtomicU64,
    skipped: AtomicU64,
    errored: AtomicU64,
    duration_ms: AtomicU64,
}

impl InvocationStatsReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_total(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_errored(&self) {
        self.errored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_duration_ms(&self, duration_ms: u64) {
        self.duration_ms.fetch_add(duration_ms, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RunSummary {
        RunSummary {
            total: self.total.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            errored: self.errored.load(Ordering::Relaxed),
            duration_ms: self.duration_ms.load(Ordering::Relaxed),
        }
    }
}

/// Final counters of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Objects returned by the listing and accepted for processing.
    pub total: u64,
    /// Objects invoked successfully (or simulated in dry-run mode).
    pub completed: u64,
    /// Objects rejected by a filter.
    pub skipped: u64,
    /// Objects whose payload could not be built or whose invocation failed.
    pub errored: u64,
    /// Sum of wall-clock time spent in successful invocations.
    pub duration_ms: u64,
}

impl RunSummary {
    /// `total == completed + skipped + errored`. Holds once every unit has
    /// finished.
    pub fn is_consistent(&self) -> bool {
        self.total == self.completed + self.skipped + self.errored
    }
}

/// AWS configuration file locations.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigLocation {
    pub aws_config_file: Option<PathBuf>,
    pub aws_shared_credentials_file: Option<PathBuf>,
}

/// AWS credential sources.
#[derive(Debug, Clone)]
pub enum S3Credentials {
    Profile(String),
    Credentials { access_keys: AccessKeys },
    FromEnvironment,
}

/// AWS access key pair with secure zeroization.
///
/// The secret_access_key and session_token are cleared from memory when this
/// struct is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AccessKeys {
    pub access_key: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Debug for AccessKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut keys = f.debug_struct("AccessKeys");
        let session_token = self
            .session_token
            .as_ref()
            .map_or("None", |_| "** redacted **");
        keys.field("access_key", &self.access_key)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &session_token);
        keys.finish()
    }
}
