//! Remote command boundary
//!
//! Everything the sync layer knows about the backend goes through
//! [`CommandGateway::invoke`]: a command name plus a JSON argument object in,
//! a JSON value out.

use async_trait::async_trait;
use serde_json::Value;

/// Commands understood by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    GetAllProjects,
    GetActiveProjects,
    GetInactiveProjects,
    GetActiveFilteredProjects,
    GetInactiveFilteredProjects,
    GetProjectById,
    InsertProject,
    UpdateProject,
    DeleteProject,
    GetSendsSummary,
    GetStylesSummary,
    GetHoldsSummary,
    SaveAnnotations,
    UploadImage,
}

impl Command {
    pub const ALL: [Command; 14] = [
        Command::GetAllProjects,
        Command::GetActiveProjects,
        Command::GetInactiveProjects,
        Command::GetActiveFilteredProjects,
        Command::GetInactiveFilteredProjects,
        Command::GetProjectById,
        Command::InsertProject,
        Command::UpdateProject,
        Command::DeleteProject,
        Command::GetSendsSummary,
        Command::GetStylesSummary,
        Command::GetHoldsSummary,
        Command::SaveAnnotations,
        Command::UploadImage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::GetAllProjects => "get_all_projects",
            Command::GetActiveProjects => "get_active_projects",
            Command::GetInactiveProjects => "get_inactive_projects",
            Command::GetActiveFilteredProjects => "get_active_filtered_projects",
            Command::GetInactiveFilteredProjects => "get_inactive_filtered_projects",
            Command::GetProjectById => "get_project_by_id",
            Command::InsertProject => "insert_project",
            Command::UpdateProject => "update_project",
            Command::DeleteProject => "delete_project",
            Command::GetSendsSummary => "get_sends_summary",
            Command::GetStylesSummary => "get_styles_summary",
            Command::GetHoldsSummary => "get_holds_summary",
            Command::SaveAnnotations => "save_annotations",
            Command::UploadImage => "upload_image",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Command::ALL.iter().copied().find(|c| c.as_str() == s)
    }

    /// Reads can be repeated without side effects
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Command::GetAllProjects
                | Command::GetActiveProjects
                | Command::GetInactiveProjects
                | Command::GetActiveFilteredProjects
                | Command::GetInactiveFilteredProjects
                | Command::GetProjectById
                | Command::GetSendsSummary
                | Command::GetStylesSummary
                | Command::GetHoldsSummary
        )
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Argument keys used in command payloads
pub mod args {
    pub const ACCOUNT_ID: &str = "accountId";
    pub const PROJECT_ID: &str = "projectId";
    pub const ID: &str = "id";
    pub const PROJECT: &str = "project";
    pub const GRADES: &str = "grades";
    pub const SENT_STATUS: &str = "sentStatus";
    pub const STYLES: &str = "styles";
    pub const HOLDS: &str = "holds";
    pub const POINTS: &str = "points";
    pub const BYTES: &str = "bytes";
    pub const NAME: &str = "name";
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rejected{}: {}", status_suffix(.status), .message)]
    Rejected { status: Option<u16>, message: String },

    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

impl GatewayError {
    pub fn rejected(message: impl Into<String>) -> Self {
        GatewayError::Rejected {
            status: None,
            message: message.into(),
        }
    }

    /// Transport failures and overloaded/5xx answers may succeed on retry
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Transport(_) => true,
            GatewayError::Rejected {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

#[async_trait]
pub trait CommandGateway: Send + Sync {
    async fn invoke(&self, command: Command, args: Value) -> Result<Value, GatewayError>;
}
