//! Replication policy
//!
//! A closed set of strategies, fixed for the lifetime of a running node,
//! controlling what gets replicated and how dialogs are constructed. Only
//! `EarlyDialog` replicates transactions: recovering a call that has not yet
//! reached a confirmed dialog requires recovering the transaction that
//! created it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Replication strategy for this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicationStrategy {
    /// Replicate confirmed dialogs, application data included.
    ConfirmedDialog,
    /// Replicate confirmed dialogs, application data stripped.
    ConfirmedDialogNoApplicationData,
    /// Replicate early dialogs and their INVITE transactions too.
    EarlyDialog,
}

impl ReplicationStrategy {
    /// Whether transactions participate in replication at all.
    pub fn replicates_transactions(&self) -> bool {
        matches!(self, ReplicationStrategy::EarlyDialog)
    }

    /// Whether dialogs replicate before reaching the confirmed state.
    pub fn replicates_early_dialogs(&self) -> bool {
        matches!(self, ReplicationStrategy::EarlyDialog)
    }

    /// Whether snapshots may carry the opaque application blob.
    pub fn replicates_application_data(&self) -> bool {
        !matches!(self, ReplicationStrategy::ConfirmedDialogNoApplicationData)
    }
}

impl Default for ReplicationStrategy {
    fn default() -> Self {
        ReplicationStrategy::ConfirmedDialog
    }
}

impl fmt::Display for ReplicationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicationStrategy::ConfirmedDialog => write!(f, "confirmed-dialog"),
            ReplicationStrategy::ConfirmedDialogNoApplicationData => {
                write!(f, "confirmed-dialog-no-application-data")
            }
            ReplicationStrategy::EarlyDialog => write!(f, "early-dialog"),
        }
    }
}

impl FromStr for ReplicationStrategy {
    type Err = ConfigError;

    /// Unknown strategy values are fatal at node startup.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirmed-dialog" => Ok(ReplicationStrategy::ConfirmedDialog),
            "confirmed-dialog-no-application-data" => {
                Ok(ReplicationStrategy::ConfirmedDialogNoApplicationData)
            }
            "early-dialog" => Ok(ReplicationStrategy::EarlyDialog),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_early_dialog_replicates_transactions() {
        assert!(ReplicationStrategy::EarlyDialog.replicates_transactions());
        assert!(!ReplicationStrategy::ConfirmedDialog.replicates_transactions());
        assert!(!ReplicationStrategy::ConfirmedDialogNoApplicationData.replicates_transactions());
    }

    #[test]
    fn test_app_data_gating() {
        assert!(ReplicationStrategy::ConfirmedDialog.replicates_application_data());
        assert!(ReplicationStrategy::EarlyDialog.replicates_application_data());
        assert!(
            !ReplicationStrategy::ConfirmedDialogNoApplicationData.replicates_application_data()
        );
    }

    #[test]
    fn test_parse_round_trip_and_unknown() {
        for s in [
            ReplicationStrategy::ConfirmedDialog,
            ReplicationStrategy::ConfirmedDialogNoApplicationData,
            ReplicationStrategy::EarlyDialog,
        ] {
            assert_eq!(s.to_string().parse::<ReplicationStrategy>().unwrap(), s);
        }
        assert!(matches!(
            "everything".parse::<ReplicationStrategy>(),
            Err(ConfigError::UnknownStrategy(_))
        ));
    }
}
