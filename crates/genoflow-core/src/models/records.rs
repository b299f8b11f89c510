use serde::{Deserialize, Serialize};

/// Whether a keyed write inserts a new row or updates the existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

impl WriteMode {
    pub fn for_new_user(user_is_new: bool) -> Self {
        if user_is_new {
            WriteMode::Create
        } else {
            WriteMode::Update
        }
    }
}

/// Everything known about one user, assembled for operators.
///
/// Missing pieces are rendered as `NA` rather than failing the whole summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: String,
    pub file_name: String,
    pub valid: bool,
    pub product_code: String,
    pub processing_status: String,
}
