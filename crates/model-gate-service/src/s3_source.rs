// crates/model-gate-service/src/s3_source.rs
// ============================================================================
// Module: S3 Artifact Source
// Description: ArtifactSource backed by S3-compatible object storage.
// Purpose: Fetch uploaded artifacts with a streamed byte ceiling.
// Dependencies: model-gate-core, model-gate-config, aws-sdk-s3, tokio
// ============================================================================

//! ## Overview
//! [`S3ArtifactSource`] exposes the blocking [`ArtifactSource`] interface over
//! the async S3 client. It owns a private tokio runtime and bridges into an
//! ambient runtime when one is present. Object bodies are streamed in fixed
//! chunks and the read stops as soon as the running total passes the limit.
//!
//! Security posture: storage is untrusted; the declared content length and
//! the streamed byte count are both checked.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::Client;
use model_gate_config::S3StorageConfig;
use model_gate_core::ArtifactLocation;
use model_gate_core::ArtifactSource;
use model_gate_core::SourceError;
use tokio::io::AsyncReadExt;
use tokio::runtime::Handle;
use tokio::runtime::Runtime;
use tokio::runtime::RuntimeFlavor;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Streaming chunk size in bytes.
const READ_CHUNK_BYTES: usize = 8192;

// ============================================================================
// SECTION: Runtime Helpers
// ============================================================================

/// Blocks on a storage future using a compatible runtime.
fn block_on_with_runtime<F, T>(runtime: &Runtime, future: F) -> Result<T, SourceError>
where
    F: Future<Output = Result<T, SourceError>> + Send + 'static,
    T: Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) {
            return tokio::task::block_in_place(|| handle.block_on(future));
        }
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        std::thread::spawn(move || {
            let result = Runtime::new()
                .map_err(|err| SourceError::Io(err.to_string()))
                .and_then(|runtime| runtime.block_on(future));
            let _ = tx.send(result);
        });
        return rx
            .recv()
            .unwrap_or_else(|_| Err(SourceError::Io("artifact fetch thread join failed".to_string())));
    }

    runtime.block_on(future)
}

// ============================================================================
// SECTION: Source
// ============================================================================

/// S3-backed artifact source.
pub struct S3ArtifactSource {
    /// Underlying S3 client.
    client: Client,
    /// Tokio runtime for blocking S3 operations.
    runtime: Option<Arc<Runtime>>,
}

impl Drop for S3ArtifactSource {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            let _ = std::thread::spawn(move || drop(runtime));
        }
    }
}

impl S3ArtifactSource {
    /// Builds an S3 client from storage configuration and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the configuration is invalid or the
    /// runtime cannot start.
    pub fn new(config: &S3StorageConfig) -> Result<Self, SourceError> {
        config.validate().map_err(|err| SourceError::Invalid(err.to_string()))?;
        let runtime = Runtime::new().map_err(|err| SourceError::Io(err.to_string()))?;
        let region = config.region.clone();
        let endpoint = config.endpoint.clone();
        let shared_config = block_on_with_runtime(&runtime, async {
            let mut loader = aws_config::defaults(BehaviorVersion::latest());
            if let Some(region) = region {
                loader = loader.region(Region::new(region));
            }
            if let Some(endpoint) = endpoint {
                loader = loader.endpoint_url(endpoint);
            }
            Ok(loader.load().await)
        })?;
        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if config.force_path_style {
            s3_builder = s3_builder.force_path_style(true);
        }
        Ok(Self {
            client: Client::from_conf(s3_builder.build()),
            runtime: Some(Arc::new(runtime)),
        })
    }

    /// Returns the runtime or an error if shut down.
    fn runtime(&self) -> Result<&Runtime, SourceError> {
        self.runtime
            .as_ref()
            .map(AsRef::as_ref)
            .ok_or_else(|| SourceError::Io("artifact source runtime closed".to_string()))
    }
}

impl ArtifactSource for S3ArtifactSource {
    fn fetch(&self, location: &ArtifactLocation, max_bytes: u64) -> Result<Vec<u8>, SourceError> {
        let bucket = location.bucket.clone();
        let key = location.key.clone();
        let client = self.client.clone();
        block_on_with_runtime(self.runtime()?, async move {
            let output = client
                .get_object()
                .bucket(bucket)
                .key(key.clone())
                .send()
                .await
                .map_err(|err| {
                    if err.as_service_error().is_some_and(|service| service.is_no_such_key()) {
                        SourceError::NotFound(key.clone())
                    } else {
                        SourceError::Backend(err.to_string())
                    }
                })?;
            if let Some(length) = output.content_length() {
                let actual_bytes = u64::try_from(length).unwrap_or(u64::MAX);
                if actual_bytes > max_bytes {
                    return Err(SourceError::TooLarge {
                        path: key.clone(),
                        max_bytes,
                        actual_bytes,
                    });
                }
            }
            let mut reader = output.body.into_async_read();
            let mut buffer = Vec::new();
            let mut total_bytes = 0u64;
            let mut chunk = [0u8; READ_CHUNK_BYTES];
            loop {
                let read =
                    reader.read(&mut chunk).await.map_err(|err| SourceError::Io(err.to_string()))?;
                if read == 0 {
                    break;
                }
                total_bytes = total_bytes
                    .checked_add(u64::try_from(read).unwrap_or(u64::MAX))
                    .ok_or_else(|| SourceError::Io("object size overflow".to_string()))?;
                if total_bytes > max_bytes {
                    return Err(SourceError::TooLarge {
                        path: key.clone(),
                        max_bytes,
                        actual_bytes: total_bytes,
                    });
                }
                buffer.extend_from_slice(&chunk[.. read]);
            }
            Ok(buffer)
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::*;

    #[test]
    fn block_on_without_ambient_runtime_uses_owned_runtime() {
        let runtime = Runtime::new().unwrap();
        let value = block_on_with_runtime(&runtime, async { Ok(7_u8) }).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn block_on_inside_current_thread_runtime_uses_helper_thread() {
        let owned = Runtime::new().unwrap();
        let ambient = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let value =
            ambient.block_on(async { block_on_with_runtime(&owned, async { Ok("done") }) }).unwrap();
        assert_eq!(value, "done");
    }

    #[test]
    fn block_on_propagates_errors() {
        let runtime = Runtime::new().unwrap();
        let result: Result<(), SourceError> = block_on_with_runtime(&runtime, async {
            Err(SourceError::Backend("denied".to_string()))
        });
        assert!(matches!(result, Err(SourceError::Backend(message)) if message == "denied"));
    }

    #[test]
    fn plain_http_endpoint_is_rejected_before_connecting() {
        let config = S3StorageConfig {
            endpoint: Some("http://localhost:9000".to_string()),
            ..S3StorageConfig::default()
        };
        let result = S3ArtifactSource::new(&config);
        assert!(matches!(result, Err(SourceError::Invalid(_))));
    }
}
