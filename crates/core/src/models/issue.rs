//! Typed view over issue notifications published to a project channel

use crate::ChannelMessage;
use serde_json::Value;

/// Issue change pushed by the server
#[derive(Debug, Clone, PartialEq)]
pub enum IssueEvent {
    Created { issue: Value },
    Updated { issue: Value },
    Deleted { issue_id: u64 },
}

impl IssueEvent {
    /// Id of the affected issue, when the payload carries one
    pub fn issue_id(&self) -> Option<u64> {
        match self {
            IssueEvent::Created { issue } | IssueEvent::Updated { issue } => {
                issue.get("id").and_then(Value::as_u64)
            }
            IssueEvent::Deleted { issue_id } => Some(*issue_id),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IssueEvent::Created { .. } => "created",
            IssueEvent::Updated { .. } => "updated",
            IssueEvent::Deleted { .. } => "deleted",
        }
    }
}

impl ChannelMessage {
    /// Interpret this message as an issue event.
    ///
    /// Accepts both `issue_created` and `issue.created` spellings. Returns
    /// `None` for other types or when the payload is missing.
    pub fn issue_event(&self) -> Option<IssueEvent> {
        let kind = self.kind.replace('.', "_");
        let data = self.data()?;
        match kind.as_str() {
            "issue_created" => Some(IssueEvent::Created { issue: data.clone() }),
            "issue_updated" => Some(IssueEvent::Updated { issue: data.clone() }),
            "issue_deleted" => data
                .get("issue_id")
                .and_then(Value::as_u64)
                .map(|issue_id| IssueEvent::Deleted { issue_id }),
            _ => None,
        }
    }
}
