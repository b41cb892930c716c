//! Amazon S3 (and S3-compatible) client built on the AWS SDK.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::{ByteStream, DateTime as SdkDateTime};
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, MetadataDirective as SdkMetadataDirective,
    ObjectCannedAcl, ServerSideEncryption,
};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::client::ObjectStoreClient;
use crate::error::{ClientConfigError, ErrorCode, RemoteError, Result};
use crate::types::{CopyRequest, ListPage, ListRequest, MetadataDirective, ObjectHead, PutRequest};

/// Region S3 treats as the default; bucket creation there takes no location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for [`S3Client`].
///
/// Unset credentials fall back to the process-wide AWS provider chain
/// (environment, profile, instance metadata).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Config {
    pub region: Option<String>,
    /// Custom endpoint (MinIO, Ceph, ...); implies path-style addressing
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub session_token: Option<String>,
    #[serde(default = "default_use_https")]
    pub use_https: bool,
}

fn default_use_https() -> bool {
    true
}

/// [`ObjectStoreClient`] talking to S3 through `aws-sdk-s3`.
#[derive(Debug, Clone)]
pub struct S3Client {
    client: Client,
    region: String,
}

impl S3Client {
    pub async fn new(config: &S3Config) -> std::result::Result<Self, ClientConfigError> {
        let region = config
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.clone()));
        match (&config.access_key, &config.secret_key) {
            (Some(key), Some(secret)) => {
                loader = loader.credentials_provider(Credentials::new(
                    key.clone(),
                    secret.clone(),
                    config.session_token.clone(),
                    None,
                    "bucketeer-config",
                ));
            }
            (None, None) => {}
            _ => {
                return Err(ClientConfigError::Invalid(
                    "access key and secret key must be set together".to_string(),
                ))
            }
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        match &config.endpoint {
            Some(endpoint) => {
                if config.use_https && endpoint.starts_with("http://") {
                    return Err(ClientConfigError::Invalid(format!(
                        "https is required but endpoint is plain http: {}",
                        endpoint
                    )));
                }
                builder = builder.endpoint_url(endpoint).force_path_style(true);
            }
            None if !config.use_https => {
                builder = builder.endpoint_url(format!("http://s3.{}.amazonaws.com", region));
            }
            None => {}
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            region,
        })
    }
}

/// Convert an SDK failure into a coded [`RemoteError`].
fn sdk_error<E, R>(err: SdkError<E, R>) -> RemoteError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = match err.code() {
        Some(code) => ErrorCode::parse(code),
        None => match &err {
            SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => ErrorCode::Transport,
            _ => ErrorCode::Other("Unknown".to_string()),
        },
    };
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    RemoteError::new(code, message)
}

/// HEAD answers a missing bucket and a missing key with the same bodiless 404.
/// `bucket_present` is the follow-up bucket check that tells them apart.
fn missing_target(bucket: &str, key: &str, bucket_present: Result<bool>) -> RemoteError {
    match bucket_present {
        Ok(false) => RemoteError::no_such_bucket(bucket),
        _ => RemoteError::no_such_key(bucket, key),
    }
}

fn to_chrono(value: Option<&SdkDateTime>) -> DateTime<Utc> {
    value
        .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos()))
        .unwrap_or_default()
}

#[async_trait]
impl ObjectStoreClient for S3Client {
    fn name(&self) -> &str {
        "s3"
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let err = sdk_error(err);
                if matches!(err.code, ErrorCode::NotFound | ErrorCode::NoSuchBucket) {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }
        request.send().await.map_err(sdk_error)?;
        debug!(bucket, region = %self.region, "bucket created");
        Ok(())
    }

    async fn put_object(&self, request: PutRequest) -> Result<()> {
        let mut put = self
            .client
            .put_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .acl(ObjectCannedAcl::from(request.acl.as_str()))
            .set_content_type(request.content_type)
            .set_content_disposition(request.content_disposition)
            .body(ByteStream::from(request.body));
        for (name, value) in request.metadata {
            put = put.metadata(name, value);
        }
        if request.server_side_encryption {
            put = put.server_side_encryption(ServerSideEncryption::Aes256);
        }
        put.send().await.map_err(sdk_error)?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(sdk_error)?;
        let body = response
            .body
            .collect()
            .await
            .map_err(|e| RemoteError::transport(e.to_string()))?;
        Ok(body.into_bytes())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectHead> {
        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                let err = sdk_error(err);
                if !err.code.is_missing_object() {
                    return Err(err);
                }
                let bucket_present = self.bucket_exists(bucket).await;
                return Err(missing_target(bucket, key, bucket_present));
            }
        };
        Ok(ObjectHead {
            size: response.content_length().unwrap_or_default().max(0) as u64,
            last_modified: to_chrono(response.last_modified()),
            etag: response.e_tag().map(str::to_string),
            content_type: response.content_type().map(str::to_string),
            metadata: response.metadata().cloned().unwrap_or_default(),
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        // S3 deletes are idempotent; surface a missing key the way the other calls do
        self.head_object(bucket, key).await?;
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn copy_object(&self, request: CopyRequest) -> Result<()> {
        let source = format!(
            "{}/{}",
            request.src_bucket,
            urlencoding::encode(&request.src_key)
        );
        let directive = match request.metadata_directive {
            MetadataDirective::Copy => SdkMetadataDirective::Copy,
            MetadataDirective::Replace => SdkMetadataDirective::Replace,
        };
        let mut copy = self
            .client
            .copy_object()
            .bucket(&request.dst_bucket)
            .key(&request.dst_key)
            .copy_source(source)
            .acl(ObjectCannedAcl::from(request.acl.as_str()))
            .metadata_directive(directive)
            .set_copy_source_if_match(request.if_match)
            .set_copy_source_if_modified_since(
                request
                    .if_modified_since
                    .map(|since| SdkDateTime::from_secs(since.timestamp())),
            );
        if request.metadata_directive == MetadataDirective::Replace {
            for (name, value) in request.metadata {
                copy = copy.metadata(name, value);
            }
        }
        if request.server_side_encryption {
            copy = copy.server_side_encryption(ServerSideEncryption::Aes256);
        }
        copy.send().await.map_err(sdk_error)?;
        Ok(())
    }

    async fn list_objects(&self, request: &ListRequest) -> Result<ListPage> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&request.bucket)
            .prefix(&request.prefix)
            .set_delimiter(request.delimiter.clone().filter(|d| !d.is_empty()))
            .set_max_keys(request.max_keys.map(|n| n.min(i32::MAX as usize) as i32))
            .set_continuation_token(request.continuation.clone())
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(ListPage {
            keys: response
                .contents()
                .iter()
                .filter_map(|object| object.key().map(str::to_string))
                .collect(),
            common_prefixes: response
                .common_prefixes()
                .iter()
                .filter_map(|prefix| prefix.prefix().map(str::to_string))
                .collect(),
            next_continuation: response.next_continuation_token().map(str::to_string),
        })
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<Url> {
        let presigning = PresigningConfig::expires_in(expires_in).map_err(|e| {
            RemoteError::new(ErrorCode::Other("InvalidRequest".into()), e.to_string())
        })?;
        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(sdk_error)?;
        Url::parse(request.uri()).map_err(|e| RemoteError::transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_bucket_behind_bodiless_404() {
        let err = missing_target("gone", "a.txt", Ok(false));
        assert_eq!(err.code, ErrorCode::NoSuchBucket);
    }

    #[test]
    fn test_missing_key_when_bucket_exists() {
        let err = missing_target("wiki", "a.txt", Ok(true));
        assert_eq!(err.code, ErrorCode::NoSuchKey);
    }

    #[test]
    fn test_bucket_check_failure_keeps_missing_key() {
        let failed = Err(RemoteError::transport("connection reset"));
        let err = missing_target("wiki", "a.txt", failed);
        assert_eq!(err.code, ErrorCode::NoSuchKey);
    }
}
