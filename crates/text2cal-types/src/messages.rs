//! Messages exchanged between the coordinator, the page context and the
//! sandboxed OCR worker. Every enum is closed; unknown discriminants decode
//! into `Unknown` so a router can answer "not handled" instead of failing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{DebugTrace, EventDetails, OcrProviderId, ParserId, RequestId};

/// Requests handled by the always-running coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CoordinatorRequest {
    Ping,
    /// Toolbar / shortcut trigger
    BeginCapture,
    /// Sent by the page to start a fresh selection
    Redraw,
    /// Capture the visible frame as a PNG data URL
    Screenshot,
    GetSettings,
    #[serde(rename_all = "camelCase")]
    RunOcr {
        provider: OcrProviderId,
        image: String,
        request_id: RequestId,
    },
    #[serde(rename_all = "camelCase")]
    RunParse {
        provider: ParserId,
        text: String,
        request_id: RequestId,
    },
    DiagTestOcr {
        provider: OcrProviderId,
        image: String,
    },
    DiagTestParse {
        provider: ParserId,
        text: String,
    },
    #[serde(other)]
    Unknown,
}

impl CoordinatorRequest {
    /// Short name for logs; never includes payloads
    pub fn kind(&self) -> &'static str {
        match self {
            CoordinatorRequest::Ping => "ping",
            CoordinatorRequest::BeginCapture => "beginCapture",
            CoordinatorRequest::Redraw => "redraw",
            CoordinatorRequest::Screenshot => "screenshot",
            CoordinatorRequest::GetSettings => "getSettings",
            CoordinatorRequest::RunOcr { .. } => "runOcr",
            CoordinatorRequest::RunParse { .. } => "runParse",
            CoordinatorRequest::DiagTestOcr { .. } => "diagTestOcr",
            CoordinatorRequest::DiagTestParse { .. } => "diagTestParse",
            CoordinatorRequest::Unknown => "unknown",
        }
    }
}

/// Messages the coordinator sends into a page context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PageMessage {
    Ping,
    BeginCapture,
    Redraw,
    #[serde(other)]
    Unknown,
}

/// Single reply to a request. `Failure` is the uniform error envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Reply {
    Ack,
    #[serde(rename_all = "camelCase")]
    Screenshot { data_url: String },
    #[serde(rename_all = "camelCase")]
    Settings {
        ocr_method: String,
        parse_method: String,
    },
    #[serde(rename_all = "camelCase")]
    OcrText {
        text: String,
        debug: DebugTrace,
        request_id: Option<RequestId>,
    },
    #[serde(rename_all = "camelCase")]
    Parsed {
        result: EventDetails,
        debug: DebugTrace,
        request_id: Option<RequestId>,
    },
    /// `debug` is the sanitized request of a call that failed after sending
    Failure {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        debug: Option<DebugTrace>,
    },
}

impl Reply {
    pub fn failure(error: impl std::fmt::Display) -> Self {
        Reply::Failure {
            error: error.to_string(),
            debug: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self, Reply::Failure { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Ack => "ack",
            Reply::Screenshot { .. } => "screenshot",
            Reply::Settings { .. } => "settings",
            Reply::OcrText { .. } => "ocrText",
            Reply::Parsed { .. } => "parsed",
            Reply::Failure { .. } => "failure",
        }
    }

    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Reply::OcrText { request_id, .. } | Reply::Parsed { request_id, .. } => *request_id,
            _ => None,
        }
    }
}

/// Tesseract page segmentation used for a job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SegmentationMode {
    Auto,
    SingleBlock,
    #[default]
    SingleLine,
}

impl SegmentationMode {
    /// Tesseract `--psm` value
    pub fn psm(&self) -> u8 {
        match self {
            SegmentationMode::Auto => 3,
            SegmentationMode::SingleBlock => 6,
            SegmentationMode::SingleLine => 7,
        }
    }
}

/// Parent → sandbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerCommand {
    Initialize,
    Ping,
    #[serde(rename_all = "camelCase")]
    RunOcrJob {
        job_id: Uuid,
        image: String,
        #[serde(default)]
        mode: SegmentationMode,
    },
    #[serde(other)]
    Unknown,
}

/// `Ready` error while the engine is still coming up
pub const NOT_INITIALIZED: &str = "not-initialized";

/// Sandbox → parent. `Ready` is pushed unsolicited on load and answers pings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerEvent {
    Ready {
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    JobResult {
        job_id: Uuid,
        outcome: JobOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobOutcome {
    Text(String),
    Failed(WorkerFault),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
pub enum WorkerFault {
    #[error("Sandbox not initialized")]
    NotInitialized,
    #[error("OCR engine error: {0}")]
    Engine(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_discriminant_decodes_to_unknown() {
        let msg: CoordinatorRequest = serde_json::from_str(r#"{"type":"somethingNew"}"#).unwrap();
        assert_eq!(msg, CoordinatorRequest::Unknown);

        let msg: PageMessage = serde_json::from_str(r#"{"type":"t2c.legacy"}"#).unwrap();
        assert_eq!(msg, PageMessage::Unknown);
    }

    #[test]
    fn test_run_ocr_wire_shape() {
        let id = RequestId::fresh();
        let msg = CoordinatorRequest::RunOcr {
            provider: OcrProviderId::GoogleVision,
            image: "data:image/png;base64,AA".into(),
            request_id: id,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "runOcr");
        assert_eq!(json["provider"], "google-vision");
        assert_eq!(json["requestId"], id.to_string());
    }

    #[test]
    fn test_failure_reply() {
        let reply = Reply::failure("Claude API key is missing.");
        assert!(!reply.is_ok());
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["kind"], "failure");
        assert_eq!(json["error"], "Claude API key is missing.");
        assert!(json.get("debug").is_none());
    }

    #[test]
    fn test_worker_job_defaults_to_single_line() {
        let cmd: WorkerCommand = serde_json::from_str(
            r#"{"type":"runOcrJob","jobId":"67e55044-10b1-426f-9247-bb680e5fe0c8","image":"data:,"}"#,
        )
        .unwrap();
        match cmd {
            WorkerCommand::RunOcrJob { mode, .. } => assert_eq!(mode.psm(), 7),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
