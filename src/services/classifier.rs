//! Gesture classifier seam.
//!
//! The vision model lives outside this crate. Sessions hand it decoded frame bytes
//! and only ever see a [`Detection`]; a failing classifier degrades to "nothing
//! detected" for that frame.

use std::sync::Arc;
use std::time::Instant;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::warn;
use thiserror::Error;

use crate::game::types::{Detection, GestureLabel};

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("frame is not valid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    #[error("frame is empty")]
    EmptyFrame,
    #[error("classifier backend failed: {0}")]
    Backend(String),
}

pub trait GestureClassifier: Send + Sync {
    /// Classify one encoded image (PNG/JPEG bytes).
    fn classify(&self, frame: &[u8]) -> Result<Detection, ClassifierError>;
}

/// Classifier used when no vision backend is wired in. Never detects anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableClassifier;

impl GestureClassifier for UnavailableClassifier {
    fn classify(&self, _frame: &[u8]) -> Result<Detection, ClassifierError> {
        Ok(Detection::none())
    }
}

/// The base64 payload of a frame, without any `data:image/...;base64,` prefix.
pub fn strip_data_url(raw: &str) -> &str {
    if raw.starts_with("data:") {
        raw.split_once(',').map(|(_, data)| data).unwrap_or("")
    } else {
        raw
    }
}

/// Decode a frame as sent by browsers: raw base64 or a `data:image/...;base64,` URL.
pub fn decode_frame(raw: &str) -> Result<Vec<u8>, ClassifierError> {
    let payload = strip_data_url(raw);
    if payload.is_empty() {
        return Err(ClassifierError::EmptyFrame);
    }
    let bytes = STANDARD.decode(payload.trim())?;
    if bytes.is_empty() {
        return Err(ClassifierError::EmptyFrame);
    }
    Ok(bytes)
}

/// Run the classifier on decoded bytes, returning the detection and the time spent (ms).
///
/// Classifier failures and out-of-range confidences are absorbed here.
pub fn classify_frame(classifier: &dyn GestureClassifier, frame: &[u8]) -> (Detection, f64) {
    let started = Instant::now();
    let detection = match classifier.classify(frame) {
        Ok(detection) => sanitize(detection),
        Err(e) => {
            warn!("[Classifier] Classification failed, treating frame as empty: {}", e);
            Detection::none()
        }
    };
    (detection, started.elapsed().as_secs_f64() * 1000.0)
}

/// [`classify_frame`] on Tokio's blocking pool. A slow model then holds a pool
/// thread instead of the arbiter the calling session and its neighbours run on.
pub async fn classify_in_background(
    classifier: Arc<dyn GestureClassifier>,
    frame: Vec<u8>,
) -> (Detection, f64) {
    match tokio::task::spawn_blocking(move || classify_frame(classifier.as_ref(), &frame)).await {
        Ok(analyzed) => analyzed,
        Err(e) => {
            warn!("[Classifier] Classification task failed: {}", e);
            (Detection::none(), 0.0)
        }
    }
}

fn sanitize(detection: Detection) -> Detection {
    if !detection.confidence.is_finite() {
        return Detection { gesture: GestureLabel::None, confidence: 0.0 };
    }
    Detection {
        gesture: detection.gesture,
        confidence: detection.confidence.clamp(0.0, 1.0),
    }
}
