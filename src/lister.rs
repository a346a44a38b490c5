use anyhow::{Result, anyhow};
use tracing::debug;

use crate::storage::Storage;
use crate::types::ListingPage;
use crate::types::error::S3ReinvokeError;

/// Paginated ListObjectsV2 cursor.
///
/// Pages are fetched one at a time, strictly in order. `start_after` is only
/// sent with the first request; every later request resumes from the
/// continuation token of the previous page.
pub struct ObjectLister {
    storage: Storage,
    prefix: String,
    start_after: Option<String>,
    max_keys: i32,
    continuation_token: Option<String>,
    pages_fetched: u64,
    exhausted: bool,
}

impl ObjectLister {
    pub fn new(storage: Storage, prefix: &str, start_after: &str, max_keys: i32) -> Self {
        Self {
            storage,
            prefix: prefix.to_string(),
            start_after: (!start_after.is_empty()).then(|| start_after.to_string()),
            max_keys,
            continuation_token: None,
            pages_fetched: 0,
            exhausted: false,
        }
    }

    /// Fetch the next page, or `None` once the listing is complete.
    ///
    /// A page that reports truncation without a continuation token is a
    /// listing error, since the listing could not be resumed.
    pub async fn next_page(&mut self) -> Result<Option<ListingPage>> {
        if self.exhausted {
            return Ok(None);
        }

        let start_after = if self.pages_fetched == 0 {
            self.start_after.as_deref()
        } else {
            None
        };

        let page = self
            .storage
            .list_objects_page(
                &self.prefix,
                start_after,
                self.continuation_token.take(),
                self.max_keys,
            )
            .await
            .inspect_err(|_| self.exhausted = true)?;

        self.pages_fetched += 1;

        debug!(
            bucket = self.storage.bucket(),
            prefix = self.prefix,
            page = self.pages_fetched,
            objects = page.objects.len(),
            is_truncated = page.is_truncated,
            "listing page has been fetched."
        );

        if page.is_truncated {
            match &page.next_continuation_token {
                Some(token) => self.continuation_token = Some(token.clone()),
                None => {
                    self.exhausted = true;
                    return Err(anyhow!(S3ReinvokeError::Listing(
                        "truncated listing page without continuation token".to_string()
                    )));
                }
            }
        } else {
            self.exhausted = true;
        }

        Ok(Some(page))
    }

    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }
}
