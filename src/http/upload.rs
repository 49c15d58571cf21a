//! File upload path
//!
//! Multipart upload with progress reporting. The access token is read once
//! when the upload starts; a 401 is not refreshed or retried, so an upload
//! started as the token expires fails and must be restarted by the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use tracing::{debug, warn};

use crate::auth::TokenStore;
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::models::{ApiResponse, UploadedFile};

/// Bytes handed to the connection per progress step.
const CHUNK_SIZE: usize = 16 * 1024;

/// Receives whole-number upload percentages, 0 to 100.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

// == Uploader ==
#[derive(Clone)]
pub struct Uploader {
    client: Client,
    url: String,
    tokens: Arc<dyn TokenStore>,
}

impl Uploader {
    pub fn new(client: Client, url: impl Into<String>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            client,
            url: url.into(),
            tokens,
        }
    }

    /// Uploader posting to the configured upload endpoint.
    pub fn from_config(config: &Config, client: Client, tokens: Arc<dyn TokenStore>) -> Self {
        let base = config.api_base_url.trim_end_matches('/');
        Self::new(client, format!("{base}{}", config.upload_endpoint), tokens)
    }

    /// Uploads `contents` as the `file` field of a multipart form.
    ///
    /// `on_progress` is called as the body is streamed out, with the share of
    /// bytes handed to the connection so far.
    pub async fn upload_file(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        on_progress: Option<ProgressFn>,
    ) -> Result<ApiResponse<UploadedFile>> {
        let total = contents.len() as u64;
        let sent = Arc::new(AtomicU64::new(0));

        let chunks: Vec<Vec<u8>> = contents.chunks(CHUNK_SIZE).map(<[u8]>::to_vec).collect();
        let body_stream =
            stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>)).inspect(move |chunk| {
                if let (Ok(chunk), Some(report)) = (chunk, &on_progress) {
                    let len = chunk.len() as u64;
                    let done = sent.fetch_add(len, Ordering::SeqCst) + len;
                    report(percent(done, total));
                }
            });

        let part = Part::stream_with_length(Body::wrap_stream(body_stream), total)
            .file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        let mut request = self.client.post(&self.url).multipart(form);
        if let Some(token) = self.tokens.access_token() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ClientError::Upload(format!("network error: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            warn!(file_name, status = status.as_u16(), "upload rejected");
            return Err(ClientError::Upload(format!("server answered {}", status.as_u16())));
        }

        let uploaded: ApiResponse<UploadedFile> = response
            .json()
            .await
            .map_err(|err| ClientError::Decode(err.to_string()))?;
        debug!(file_name, bytes = total, "upload finished");
        Ok(uploaded)
    }
}

fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done * 100 + total / 2) / total).min(100) as u8
}
