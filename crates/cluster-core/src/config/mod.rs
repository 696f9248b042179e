//! Node configuration
//!
//! Explicitly passed at coordinator construction; there is no process-wide
//! registry. Validation runs once at startup and is the only place
//! configuration errors are fatal.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ConfigError, ConfigResult};
use crate::policy::ReplicationStrategy;

/// Cluster configuration for one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Whether this node participates in a cluster at all. When false the
    /// coordinator behaves exactly like the base engine.
    pub clustered: bool,

    /// Identity of this node; stamps outgoing mutations so remote-origin
    /// notifications can be told apart from our own.
    pub node_id: String,

    /// Active replication strategy, fixed for the node's lifetime.
    pub strategy: ReplicationStrategy,

    /// Independent toggle for including opaque application data in
    /// snapshots; ANDed with what the strategy allows.
    pub replicate_application_data: bool,
}

impl ClusterConfig {
    pub fn builder() -> ClusterConfigBuilder {
        ClusterConfigBuilder::default()
    }

    /// Effective application-data inclusion for newly created dialogs.
    pub fn effective_application_data(&self) -> bool {
        self.replicate_application_data && self.strategy.replicates_application_data()
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.node_id.trim().is_empty() {
            return Err(ConfigError::Invalid("node_id must not be empty".into()));
        }
        Ok(())
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            clustered: true,
            node_id: Uuid::new_v4().to_string(),
            strategy: ReplicationStrategy::default(),
            replicate_application_data: true,
        }
    }
}

/// Builder for [`ClusterConfig`].
#[derive(Debug, Default)]
pub struct ClusterConfigBuilder {
    clustered: Option<bool>,
    node_id: Option<String>,
    strategy: Option<ReplicationStrategy>,
    replicate_application_data: Option<bool>,
}

impl ClusterConfigBuilder {
    pub fn clustered(mut self, clustered: bool) -> Self {
        self.clustered = Some(clustered);
        self
    }

    pub fn node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn strategy(mut self, strategy: ReplicationStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Parse a strategy from its configured string form; unknown values are
    /// fatal here, never at request-handling time.
    pub fn strategy_str(mut self, raw: &str) -> ConfigResult<Self> {
        self.strategy = Some(raw.parse()?);
        Ok(self)
    }

    pub fn replicate_application_data(mut self, replicate: bool) -> Self {
        self.replicate_application_data = Some(replicate);
        self
    }

    pub fn build(self) -> ConfigResult<ClusterConfig> {
        let defaults = ClusterConfig::default();
        let config = ClusterConfig {
            clustered: self.clustered.unwrap_or(defaults.clustered),
            node_id: self.node_id.unwrap_or(defaults.node_id),
            strategy: self.strategy.unwrap_or(defaults.strategy),
            replicate_application_data: self
                .replicate_application_data
                .unwrap_or(defaults.replicate_application_data),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = ClusterConfig::builder().build().unwrap();
        assert!(config.clustered);
        assert_eq!(config.strategy, ReplicationStrategy::ConfirmedDialog);
        assert!(config.effective_application_data());
    }

    #[test]
    fn test_unknown_strategy_is_fatal_at_startup() {
        assert!(ClusterConfig::builder().strategy_str("bogus").is_err());
    }

    #[test]
    fn test_app_data_toggle_is_anded_with_strategy() {
        let config = ClusterConfig::builder()
            .strategy(ReplicationStrategy::ConfirmedDialogNoApplicationData)
            .replicate_application_data(true)
            .build()
            .unwrap();
        assert!(!config.effective_application_data());

        let config = ClusterConfig::builder()
            .strategy(ReplicationStrategy::ConfirmedDialog)
            .replicate_application_data(false)
            .build()
            .unwrap();
        assert!(!config.effective_application_data());
    }

    #[test]
    fn test_empty_node_id_rejected() {
        assert!(ClusterConfig::builder().node_id("  ").build().is_err());
    }
}
