//! Validation and processing status enumerations.
//!
//! Statuses are stored as lowercase text. Anything outside the fixed sets is
//! rejected with [`InvalidStatus`] before it can reach storage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rendered in place of a status or product code that has no record yet.
pub const NOT_AVAILABLE: &str = "NA";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} status: {value:?}")]
pub struct InvalidStatus {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    New,
    Running,
    Valid,
    Invalid,
    Error,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::New => "new",
            ValidationStatus::Running => "running",
            ValidationStatus::Valid => "valid",
            ValidationStatus::Invalid => "invalid",
            ValidationStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ValidationStatus::Valid | ValidationStatus::Invalid | ValidationStatus::Error
        )
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(ValidationStatus::New),
            "running" => Ok(ValidationStatus::Running),
            "valid" => Ok(ValidationStatus::Valid),
            "invalid" => Ok(ValidationStatus::Invalid),
            "error" => Ok(ValidationStatus::Error),
            other => Err(InvalidStatus {
                kind: "validation",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    New,
    Running,
    Done,
    Error,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::New => "new",
            ProcessingStatus::Running => "running",
            ProcessingStatus::Done => "done",
            ProcessingStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Done | ProcessingStatus::Error)
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(ProcessingStatus::New),
            "running" => Ok(ProcessingStatus::Running),
            "done" => Ok(ProcessingStatus::Done),
            "error" => Ok(ProcessingStatus::Error),
            other => Err(InvalidStatus {
                kind: "processing",
                value: other.to_string(),
            }),
        }
    }
}

/// Render an optional value, falling back to [`NOT_AVAILABLE`].
pub fn display_or_na<T: fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
