//! Emotion classifier
//!
//! Maps free text to one emotion label. The external sentiment service is
//! tried first when configured; any failure falls back to a deterministic
//! keyword table covering English and Tamil. The classifier never fails.

use crate::clients::SentimentService;
use std::sync::Arc;
use tracing::{debug, warn};

/// Label returned when nothing matches
pub const DEFAULT_EMOTION: &str = "happy";

/// Trigger substrings per emotion, checked in this order
///
/// Order matters: "excited" must resolve to `happy` before the broader
/// `energetic` trigger "excite" is consulted.
pub const EMOTION_KEYWORDS: &[(&str, &[&str])] = &[
    ("happy", &["happy", "joy", "excited", "மகிழ்ச்சி", "சந்தோஷம்", "ஆனந்தம்"]),
    ("sad", &["sad", "depress", "lonely", "வருத்தம்", "துக்கம்", "சோகம்"]),
    ("energetic", &["energetic", "pump", "excite", "ஆற்றல்", "உற்சாகம்"]),
    ("calm", &["calm", "peace", "relax", "அமைதி", "சாந்தி"]),
    ("angry", &["angry", "rage", "frustrat", "கோபம்", "ஆத்திரம்"]),
];

/// Text → emotion label
#[derive(Clone)]
pub struct EmotionClassifier {
    service: Option<Arc<dyn SentimentService>>,
}

impl EmotionClassifier {
    /// `service` is `None` when no sentiment API key is configured
    pub fn new(service: Option<Arc<dyn SentimentService>>) -> Self {
        Self { service }
    }

    /// Keyword-only classifier
    pub fn keyword_only() -> Self {
        Self { service: None }
    }

    /// Classify `text`; always returns a lowercase label
    pub async fn classify(&self, text: &str) -> String {
        if let Some(service) = &self.service {
            match service.detect_emotion(text).await {
                Ok(label) => {
                    let label = label.trim().to_lowercase();
                    debug!(emotion = %label, "Emotion from sentiment service");
                    return label;
                }
                Err(e) => {
                    warn!(error = %e, "Sentiment service failed, falling back to keyword detection");
                }
            }
        } else {
            debug!("Sentiment service not configured, using keyword detection");
        }

        match_keywords(text).to_string()
    }
}

/// First emotion whose trigger is a case-insensitive substring of `text`
pub fn match_keywords(text: &str) -> &'static str {
    let text = text.to_lowercase();
    EMOTION_KEYWORDS
        .iter()
        .find(|(_, triggers)| triggers.iter().any(|t| text.contains(t)))
        .map(|(emotion, _)| *emotion)
        .unwrap_or(DEFAULT_EMOTION)
}
