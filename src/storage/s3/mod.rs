use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use std::sync::Arc;

use crate::storage::StorageTrait;
use crate::types::error::{S3ReinvokeError, extract_sdk_error_details};
use crate::types::{ListingPage, S3Object};

/// S3 storage backed by ListObjectsV2.
#[derive(Clone)]
pub struct S3Storage {
    bucket: String,
    client: Arc<Client>,
    region: Option<String>,
}

impl S3Storage {
    pub fn new(bucket: &str, client: Client, region: Option<String>) -> Self {
        Self {
            bucket: bucket.to_string(),
            client: Arc::new(client),
            region,
        }
    }
}

#[async_trait]
impl StorageTrait for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn region(&self) -> Option<String> {
        self.region.clone()
    }

    async fn list_objects_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        continuation_token: Option<String>,
        max_keys: i32,
    ) -> Result<ListingPage> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .set_start_after(start_after.map(String::from))
            .set_continuation_token(continuation_token)
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                anyhow::anyhow!(S3ReinvokeError::Listing(format!(
                    "s3://{}/{prefix}: {s3_error_code} ({s3_error_message})",
                    self.bucket
                )))
                .context("aws_sdk_s3::client::list_objects_v2() failed.")
            })?;

        Ok(to_listing_page(&output))
    }
}

fn to_listing_page(output: &ListObjectsV2Output) -> ListingPage {
    ListingPage {
        objects: output.contents().iter().map(S3Object::from).collect(),
        is_truncated: output.is_truncated() == Some(true),
        next_continuation_token: output.next_continuation_token().map(String::from),
    }
}
