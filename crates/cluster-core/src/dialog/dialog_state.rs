//! Dialog state machine

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// State of a replicated dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogState {
    /// Created by a request, no final response yet.
    Early,
    /// Confirmed by a final response; eligible for replication.
    Confirmed,
    /// Terminated locally or remotely.
    Terminated,
}

impl fmt::Display for DialogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialogState::Early => write!(f, "early"),
            DialogState::Confirmed => write!(f, "confirmed"),
            DialogState::Terminated => write!(f, "terminated"),
        }
    }
}

impl FromStr for DialogState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "early" => Ok(DialogState::Early),
            "confirmed" => Ok(DialogState::Confirmed),
            "terminated" => Ok(DialogState::Terminated),
            other => Err(format!("unknown dialog state '{}'", other)),
        }
    }
}
