//! JSON messages exchanged over the bus.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two job domains; also the `rsp_type` of a completion notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Validation,
    Processing,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Validation => "validation",
            JobKind::Processing => "processing",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationJob {
    pub user_id: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingJob {
    pub user_id: String,
    pub file_name: String,
    pub barcode: String,
}

/// Published to a domain's output exchange after every consumed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionNotification {
    pub user_id: String,
    pub file_name: String,
    pub rsp_type: JobKind,
    pub is_ready: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_wire_format() {
        let msg = CompletionNotification {
            user_id: "u1".into(),
            file_name: "f1".into(),
            rsp_type: JobKind::Processing,
            is_ready: false,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "user_id": "u1",
                "file_name": "f1",
                "rsp_type": "processing",
                "is_ready": false
            })
        );
    }

    #[test]
    fn processing_job_requires_barcode() {
        let err = serde_json::from_str::<ProcessingJob>(r#"{"user_id":"u","file_name":"f"}"#);
        assert!(err.is_err());
        let job: ProcessingJob =
            serde_json::from_str(r#"{"user_id":"u","file_name":"f","barcode":"B1"}"#).unwrap();
        assert_eq!(job.barcode, "B1");
    }
}
