use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::error::SignetError;

/// Lifecycle status shared by documents and auto signature terms.
///
/// The happy path is Draft -> Ready -> Processing -> Sent; the terminal
/// states (Signed, Cancelled, Failed) are reached through webhook
/// reconciliation only, except for Failed which a terminal submission
/// error can also set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    Ready,
    Processing,
    Sent,
    Signed,
    Cancelled,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Draft => "draft",
            Status::Ready => "ready",
            Status::Processing => "processing",
            Status::Sent => "sent",
            Status::Signed => "signed",
            Status::Cancelled => "cancelled",
            Status::Failed => "failed",
        }
    }

    /// No further transitions occur from a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Signed | Status::Cancelled | Status::Failed)
    }

    /// Records in a locked status are immutable via the public update and
    /// delete paths.
    pub fn is_locked(&self) -> bool {
        matches!(self, Status::Processing | Status::Sent) || self.is_terminal()
    }

    /// Target status for a provider lifecycle event kind, e.g. the
    /// "finished" in "auto_signature_term.finished". Unknown kinds map to
    /// nothing and are recorded as anomalies by the reconciler.
    pub fn webhook_target(event_kind: &str) -> Option<Status> {
        match event_kind {
            "finished" | "signed" => Some(Status::Signed),
            "cancelled" | "canceled" => Some(Status::Cancelled),
            "refused" | "failed" => Some(Status::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = SignetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Status::Draft),
            "ready" => Ok(Status::Ready),
            "processing" => Ok(Status::Processing),
            "sent" => Ok(Status::Sent),
            "signed" => Ok(Status::Signed),
            "cancelled" => Ok(Status::Cancelled),
            "failed" => Ok(Status::Failed),
            other => Err(SignetError::Database {
                message: format!("unknown status value '{other}'"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_round_trip() {
        for status in [
            Status::Draft,
            Status::Ready,
            Status::Processing,
            Status::Sent,
            Status::Signed,
            Status::Cancelled,
            Status::Failed,
        ] {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
        }
    }

    #[test]
    fn serde_uses_lowercase_wire_values() {
        assert_eq!(serde_json::to_string(&Status::Draft).unwrap(), "\"draft\"");
        let parsed: Status = serde_json::from_str("\"sent\"").unwrap();
        assert_eq!(parsed, Status::Sent);
    }

    #[test]
    fn locked_statuses_cover_processing_sent_and_terminals() {
        assert!(!Status::Draft.is_locked());
        assert!(!Status::Ready.is_locked());
        assert!(Status::Processing.is_locked());
        assert!(Status::Sent.is_locked());
        assert!(Status::Signed.is_locked());
        assert!(Status::Cancelled.is_locked());
        assert!(Status::Failed.is_locked());
    }

    #[test]
    fn terminal_statuses() {
        assert!(Status::Signed.is_terminal());
        assert!(Status::Cancelled.is_terminal());
        assert!(Status::Failed.is_terminal());
        assert!(!Status::Sent.is_terminal());
    }

    #[test]
    fn webhook_event_kinds_map_to_terminal_statuses() {
        assert_eq!(Status::webhook_target("finished"), Some(Status::Signed));
        assert_eq!(Status::webhook_target("cancelled"), Some(Status::Cancelled));
        assert_eq!(Status::webhook_target("refused"), Some(Status::Failed));
        assert_eq!(Status::webhook_target("updated"), None);
    }
}
