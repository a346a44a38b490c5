use anyhow::Result;
use async_trait::async_trait;
use dyn_clone::DynClone;

use crate::types::ListingPage;

pub mod s3;

/// Type alias for a boxed Storage trait object.
pub type Storage = Box<dyn StorageTrait + Send + Sync>;

/// Object-listing capability used by the lister.
///
/// Implemented by [`s3::S3Storage`] for real buckets; tests and library
/// users can supply their own implementation.
#[async_trait]
pub trait StorageTrait: DynClone {
    /// Bucket this storage lists.
    fn bucket(&self) -> &str;

    /// Region of the bucket's client, if known. Used as the `awsRegion` of
    /// the synthetic event.
    fn region(&self) -> Option<String>;

    /// Fetch one ListObjectsV2 page.
    ///
    /// `start_after` is only meaningful on the first request of a listing;
    /// later requests resume from `continuation_token`. Failures are
    /// unrecoverable for the run.
    async fn list_objects_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        continuation_token: Option<String>,
        max_keys: i32,
    ) -> Result<ListingPage>;
}

dyn_clone::clone_trait_object!(StorageTrait);

/// Create the S3 storage for `bucket` from an already-built client.
pub fn create_storage(
    bucket: &str,
    client: aws_sdk_s3::Client,
    region: Option<String>,
) -> Storage {
    Box::new(s3::S3Storage::new(bucket, client, region))
}
