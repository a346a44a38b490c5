//! Admission gate bounding the number of in-flight invocations.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::types::token::PipelineCancellationToken;

/// Counting gate of fixed capacity.
///
/// A slot is held for as long as its [`AdmissionPermit`] lives and is
/// returned when the permit is dropped, whichever way the holder exits.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// One occupied gate slot. Released on drop.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "admission gate capacity must be at least 1");

        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> AdmissionPermit {
        // The semaphore is owned by the gate and never closed.
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("admission gate semaphore is never closed");

        AdmissionPermit { _permit: permit }
    }

    /// Wait for a free slot unless `cancellation_token` fires first.
    ///
    /// Returns `None` on cancellation; no slot is held in that case.
    pub async fn acquire_or_cancel(
        &self,
        cancellation_token: &PipelineCancellationToken,
    ) -> Option<AdmissionPermit> {
        if cancellation_token.is_cancelled() {
            return None;
        }

        tokio::select! {
            biased;
            _ = cancellation_token.cancelled() => None,
            permit = self.acquire() => Some(permit),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    pub fn in_use(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }
}
