//! Sapling emotion API client
//!
//! # API Reference
//! - Endpoint: https://api.sapling.ai/api/v1/emotion
//! - Auth: `API-KEY` header

use super::SentimentService;
use crate::error::UpstreamError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Sapling emotion endpoint
const SAPLING_EMOTION_URL: &str = "https://api.sapling.ai/api/v1/emotion";

/// Sapling sentiment client
pub struct SaplingClient {
    http_client: Client,
    api_key: String,
    endpoint: String,
}

impl SaplingClient {
    pub fn new(http_client: Client, api_key: String) -> Self {
        Self {
            http_client,
            api_key,
            endpoint: SAPLING_EMOTION_URL.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct EmotionRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmotionResponse {
    emotion: Option<String>,
}

#[async_trait]
impl SentimentService for SaplingClient {
    async fn detect_emotion(&self, text: &str) -> Result<String, UpstreamError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .header("API-KEY", &self.api_key)
            .json(&EmotionRequest { text })
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest("Sapling", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::from_status("Sapling", status));
        }

        let body: EmotionResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(format!("Failed to parse Sapling response: {}", e)))?;

        body.emotion
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| UpstreamError::Parse("Sapling response has no emotion label".to_string()))
    }
}
