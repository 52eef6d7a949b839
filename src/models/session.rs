use serde::{Deserialize, Serialize};

use super::grade::GradeScale;
use crate::error::SyncError;

/// Explicit per-call context. Every query and write is scoped by the
/// account carried here instead of reading ambient storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Session {
    pub token: Option<String>,
    pub account_id: Option<String>,
    #[serde(default)]
    pub grade_scale: GradeScale,
}

impl Session {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            token: None,
            account_id: Some(account_id.into()),
            grade_scale: GradeScale::default(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_grade_scale(mut self, grade_scale: GradeScale) -> Self {
        self.grade_scale = grade_scale;
        self
    }

    /// The account id, or a precondition failure when none is set
    pub fn require_account(&self) -> Result<&str, SyncError> {
        self.account_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(SyncError::MissingAccount)
    }
}
