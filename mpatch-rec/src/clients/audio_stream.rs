//! Secondary-source audio stream fetch
//!
//! Forwards the bytes of an audio rendition served by an external extractor
//! endpoint (for example an Invidious `latest_version?id={id}&itag=140`
//! URL). Nothing is decoded or re-encoded here; the body is streamed through
//! chunk by chunk.

use super::{AudioStream, AudioStreamSource};
use crate::error::UpstreamError;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Placeholder replaced by the video identifier in the URL template
pub const ID_PLACEHOLDER: &str = "{id}";

/// HTTP stream source built from a URL template
pub struct HttpAudioStream {
    http_client: Client,
    url_template: String,
    /// Bound on waiting for response headers; the body itself is unbounded
    header_timeout: Duration,
}

impl HttpAudioStream {
    /// `http_client` must not carry a total request timeout, or long tracks
    /// would be cut off mid-stream
    pub fn new(http_client: Client, url_template: String, header_timeout: Duration) -> Self {
        Self {
            http_client,
            url_template,
            header_timeout,
        }
    }

    fn url_for(&self, video_id: &str) -> String {
        self.url_template.replace(ID_PLACEHOLDER, video_id)
    }
}

#[async_trait]
impl AudioStreamSource for HttpAudioStream {
    async fn open_stream(&self, video_id: &str) -> Result<AudioStream, UpstreamError> {
        let url = self.url_for(video_id);
        debug!(video_id = %video_id, "Opening secondary audio stream");

        let response = tokio::time::timeout(self.header_timeout, self.http_client.get(&url).send())
            .await
            .map_err(|_| UpstreamError::Timeout(format!("Audio stream for {} did not respond", video_id)))?
            .map_err(|e| UpstreamError::from_reqwest("Audio stream", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::from_status("Audio stream", status));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| UpstreamError::Network(format!("Audio stream interrupted: {}", e))))
            .boxed();

        Ok(AudioStream { content_type, body })
    }
}
