use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::VideoId;
use crate::output::ErrorBody;
use crate::resolver::Exhausted;

/// Classified transcript failure with a user-facing message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("This video doesn't have captions/subtitles available")]
    NoCaptions,

    #[error("Video is unavailable or private")]
    VideoUnavailable,

    #[error("Transcripts are disabled for this video")]
    CaptionsDisabled,

    #[error("Rate limited - please try again in a few minutes")]
    RateLimited,

    #[error("{0}")]
    Unknown(String),
}

impl TranscriptError {
    /// Map a raw failure message onto a known category, first match wins
    pub fn classify(raw: &str) -> Self {
        if raw.contains("No transcripts were found") {
            Self::NoCaptions
        } else if raw.contains("Video unavailable") {
            Self::VideoUnavailable
        } else if raw.contains("Transcript is disabled") {
            Self::CaptionsDisabled
        } else if raw.contains("HTTP Error 429") {
            Self::RateLimited
        } else {
            Self::Unknown(raw.to_string())
        }
    }
}

impl From<Exhausted> for TranscriptError {
    fn from(e: Exhausted) -> Self {
        Self::classify(&e.to_string())
    }
}

/// Errors returned by the HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid video ID format")]
    InvalidVideoId,

    #[error("{error}")]
    Resolution { error: TranscriptError, video_id: VideoId },

    #[error("Endpoint not found. Use /transcript/<video_id> or /health")]
    NotFound,

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidVideoId | ApiError::Resolution { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let video_id = match &self {
            ApiError::Resolution { video_id, .. } => Some(video_id.to_string()),
            _ => None,
        };
        let body = ErrorBody::new(self.to_string(), video_id);

        (status, Json(body)).into_response()
    }
}
