//! Synthetic S3 `ObjectCreated:Put` notification payloads.
//!
//! The payload follows the S3 event notification schema that Lambda
//! receives from a bucket trigger, so the target function handles a
//! re-invocation exactly like the original notification.

use anyhow::{Result, anyhow};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::S3Object;
use crate::types::error::S3ReinvokeError;

pub const DEFAULT_REGION: &str = "us-east-1";

const EVENT_VERSION: &str = "2.1";
const EVENT_SOURCE: &str = "aws:s3";
const EVENT_NAME: &str = "ObjectCreated:Put";
const S3_SCHEMA_VERSION: &str = "1.0";
const SOURCE_IP_ADDRESS: &str = "127.0.0.1";
const ORIGINATOR: &str = "s3-reinvoke-lambda";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3Event {
    #[serde(rename = "Records")]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3EventRecord {
    pub event_version: String,
    pub event_source: String,
    pub aws_region: String,
    pub event_time: String,
    pub event_name: String,
    pub user_identity: S3UserIdentity,
    pub request_parameters: S3RequestParameters,
    pub response_elements: BTreeMap<String, String>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3UserIdentity {
    pub principal_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3RequestParameters {
    #[serde(rename = "sourceIPAddress")]
    pub source_ip_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Entity {
    pub s3_schema_version: String,
    pub configuration_id: String,
    pub bucket: S3Bucket,
    pub object: S3ObjectEntity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Bucket {
    pub name: String,
    pub owner_identity: S3UserIdentity,
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3ObjectEntity {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default)]
    pub e_tag: String,
    #[serde(default)]
    pub sequencer: String,
}

impl S3Event {
    /// Build the single-record event for `object` in `bucket`.
    ///
    /// `region` falls back to [`DEFAULT_REGION`] when unknown. The event time
    /// is the current wall-clock time.
    pub fn object_created(region: Option<&str>, bucket: &str, object: &S3Object) -> Self {
        let response_elements = BTreeMap::from([
            ("x-amz-request-id".to_string(), ORIGINATOR.to_string()),
            ("x-amz-id-2".to_string(), ORIGINATOR.to_string()),
        ]);

        S3Event {
            records: vec![S3EventRecord {
                event_version: EVENT_VERSION.to_string(),
                event_source: EVENT_SOURCE.to_string(),
                aws_region: region.unwrap_or(DEFAULT_REGION).to_string(),
                event_time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                event_name: EVENT_NAME.to_string(),
                user_identity: S3UserIdentity::default(),
                request_parameters: S3RequestParameters {
                    source_ip_address: SOURCE_IP_ADDRESS.to_string(),
                },
                response_elements,
                s3: S3Entity {
                    s3_schema_version: S3_SCHEMA_VERSION.to_string(),
                    configuration_id: ORIGINATOR.to_string(),
                    bucket: S3Bucket {
                        name: bucket.to_string(),
                        owner_identity: S3UserIdentity::default(),
                        arn: format!("arn:aws:s3:::{bucket}"),
                    },
                    object: S3ObjectEntity {
                        key: object.key.clone(),
                        size: object.size,
                        e_tag: object.e_tag.clone().unwrap_or_default(),
                        sequencer: String::new(),
                    },
                },
            }],
        }
    }
}

/// Serialize the synthetic event for `object` into the Lambda payload.
pub fn build_s3_event_payload(
    region: Option<&str>,
    bucket: &str,
    object: &S3Object,
) -> Result<Vec<u8>> {
    let event = S3Event::object_created(region, bucket, object);
    serde_json::to_vec(&event).map_err(|e| {
        anyhow!(S3ReinvokeError::PayloadBuild {
            key: object.key.clone(),
            message: e.to_string(),
        })
    })
}
