use serde::Serialize;

use crate::resolver::Diagnostic;
use crate::{ResolutionMethod, Segment, Transcript};

/// Successful transcript response
#[derive(Debug, Serialize)]
pub struct TranscriptBody {
    pub success: bool,
    pub transcript: Vec<Segment>,
    pub method: ResolutionMethod,
    pub video_id: String,
}

impl From<Transcript> for TranscriptBody {
    fn from(t: Transcript) -> Self {
        Self {
            success: true,
            transcript: t.segments,
            method: t.method,
            video_id: t.video_id.to_string(),
        }
    }
}

/// Failure response shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, video_id: Option<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            video_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// Per-strategy report from the diagnostic endpoint
#[derive(Debug, Serialize)]
pub struct DiagnosticBody {
    pub video_id: String,
    pub test_results: Vec<Diagnostic>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VideoId;

    fn sample_transcript() -> Transcript {
        Transcript {
            video_id: VideoId::parse("jh4FH-EDGJ4").unwrap(),
            method: ResolutionMethod::Auto,
            segments: vec![
                Segment {
                    text: "Hello world".to_string(),
                    start: 0.0,
                    duration: 1.5,
                },
                Segment {
                    text: "This is a test".to_string(),
                    start: 1.5,
                    duration: 2.0,
                },
            ],
        }
    }

    #[test]
    fn test_transcript_body_shape() {
        let body = TranscriptBody::from(sample_transcript());
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "transcript": [
                    {"text": "Hello world", "start": 0.0, "duration": 1.5},
                    {"text": "This is a test", "start": 1.5, "duration": 2.0}
                ],
                "method": "auto",
                "video_id": "jh4FH-EDGJ4"
            })
        );
    }

    #[test]
    fn test_error_body_omits_missing_video_id() {
        let json = serde_json::to_value(ErrorBody::new("Invalid video ID format", None)).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "Invalid video ID format"}));
    }

    #[test]
    fn test_error_body_with_video_id() {
        let body = ErrorBody::new("Video is unavailable or private", Some("jh4FH-EDGJ4".to_string()));
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json["video_id"], "jh4FH-EDGJ4");
        assert_eq!(json["success"], false);
    }
}
