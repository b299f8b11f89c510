use serde::{Deserialize, Serialize};

/// Structured output printed by the compute executable's `validate` command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub mode: String,
    pub sex: String,
    #[serde(rename = "error", default)]
    pub error_message: String,
    pub passed: bool,
}

impl ValidationResult {
    /// Parse the executable's standard output.
    ///
    /// Leading and trailing whitespace (including the final newline) is ignored.
    pub fn from_stdout(stdout: &[u8]) -> Result<Self, serde_json::Error> {
        let text = String::from_utf8_lossy(stdout);
        serde_json::from_str(text.trim())
    }
}
