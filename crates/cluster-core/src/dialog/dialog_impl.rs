//! Dialog implementation
//!
//! One dialog value type serves every replication strategy; the
//! `replicate_application_data` flag set at construction controls whether the
//! opaque application blob is carried into snapshots. The version counter is
//! bumped on every state-changing protocol event and drives the
//! strictly-greater merge rule in the store.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{MessageChannel, Transport};

use super::dialog_key::{early_key, DialogKey};
use super::dialog_state::DialogState;
use crate::protocol::Uri;

/// Shared handle so concurrent recreation winners are reference-comparable.
pub type SharedDialog = Arc<RwLock<Dialog>>;

/// A replicated SIP dialog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dialog {
    /// Call-ID for this dialog
    pub call_id: String,

    /// Local tag
    pub local_tag: Option<String>,

    /// Remote tag
    pub remote_tag: Option<String>,

    /// Local party URI
    pub local_uri: Uri,

    /// Remote party URI
    pub remote_uri: Uri,

    /// Remote target URI (where to send requests)
    pub remote_target: Uri,

    /// Route set for this dialog, ordered
    pub route_set: Vec<Uri>,

    /// Serialized last response seen on this dialog
    pub last_response: Option<String>,

    /// Current state of the dialog
    pub state: DialogState,

    /// Monotonic replication version
    pub version: u64,

    /// Transport this dialog is bound to
    pub transport: Option<Transport>,

    /// Whether this dialog was created by the local UA
    pub is_initiator: bool,

    /// Opaque application data
    pub application_data: Option<Bytes>,

    /// Whether application data participates in snapshots (policy-driven)
    pub replicate_application_data: bool,

    /// Local message channel; never replicated, rebound on reconstruction
    #[serde(skip)]
    pub channel: Option<MessageChannel>,
}

/// Everything the engine hands over when it asks for a dialog.
#[derive(Debug, Clone)]
pub struct DialogContext {
    pub call_id: String,
    pub local_uri: Uri,
    pub remote_uri: Uri,
    pub local_tag: Option<String>,
    pub remote_tag: Option<String>,
    pub remote_target: Option<Uri>,
    pub route_set: Vec<Uri>,
    pub transport: Option<Transport>,
    pub is_initiator: bool,
    pub application_data: Option<Bytes>,
}

impl Dialog {
    /// Create an early dialog from an engine context; the policy decides the
    /// application-data flag.
    pub fn from_context(ctx: &DialogContext, replicate_application_data: bool) -> Self {
        Self {
            call_id: ctx.call_id.clone(),
            local_tag: ctx.local_tag.clone(),
            remote_tag: ctx.remote_tag.clone(),
            local_uri: ctx.local_uri.clone(),
            remote_uri: ctx.remote_uri.clone(),
            remote_target: ctx
                .remote_target
                .clone()
                .unwrap_or_else(|| ctx.remote_uri.clone()),
            route_set: ctx.route_set.clone(),
            last_response: None,
            state: DialogState::Early,
            version: 0,
            transport: ctx.transport,
            is_initiator: ctx.is_initiator,
            application_data: ctx.application_data.clone(),
            replicate_application_data,
            channel: None,
        }
    }

    /// Wrap into the shared handle used by the coordinator tables.
    pub fn into_shared(self) -> SharedDialog {
        Arc::new(RwLock::new(self))
    }

    /// Established key, available once both tags are known.
    pub fn key(&self) -> Option<DialogKey> {
        match (&self.local_tag, &self.remote_tag) {
            (Some(local), Some(remote)) => {
                Some(DialogKey::new(self.call_id.clone(), local.clone(), remote.clone()))
            }
            _ => None,
        }
    }

    /// Table key while the dialog is still early.
    pub fn early_key(&self) -> String {
        early_key(&self.call_id, self.local_tag.as_deref())
    }

    /// Bump the replication version after a state-changing protocol event.
    pub fn bump_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    /// Confirm the dialog with the final response's remote tag and target.
    pub fn confirm(
        &mut self,
        remote_tag: Option<String>,
        remote_target: Option<Uri>,
        route_set: Option<Vec<Uri>>,
    ) {
        if let Some(tag) = remote_tag {
            self.remote_tag = Some(tag);
        }
        if let Some(target) = remote_target {
            self.remote_target = target;
        }
        if let Some(routes) = route_set {
            self.route_set = routes;
        }
        self.state = DialogState::Confirmed;
        self.bump_version();
        debug!(call_id = %self.call_id, version = self.version, "dialog confirmed");
    }

    /// Record the serialized last response.
    pub fn set_last_response(&mut self, raw: String) {
        self.last_response = Some(raw);
        self.bump_version();
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == DialogState::Confirmed
    }

    /// Terminate the dialog
    pub fn terminate(&mut self) {
        self.state = DialogState::Terminated;
    }

    /// Check if dialog is terminated
    pub fn is_terminated(&self) -> bool {
        self.state == DialogState::Terminated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> DialogContext {
        DialogContext {
            call_id: "test-call-id".to_string(),
            local_uri: "sip:alice@example.com".parse().unwrap(),
            remote_uri: "sip:bob@example.com".parse().unwrap(),
            local_tag: Some("tag1".to_string()),
            remote_tag: None,
            remote_target: None,
            route_set: Vec::new(),
            transport: Some(Transport::Udp),
            is_initiator: true,
            application_data: None,
        }
    }

    #[test]
    fn test_dialog_creation() {
        let dialog = Dialog::from_context(&ctx(), true);
        assert_eq!(dialog.call_id, "test-call-id");
        assert_eq!(dialog.state, DialogState::Early);
        assert!(dialog.is_initiator);
        assert_eq!(dialog.version, 0);
        // target defaults to the remote URI until a Contact is seen
        assert_eq!(dialog.remote_target, dialog.remote_uri);
    }

    #[test]
    fn test_key_requires_both_tags() {
        let mut dialog = Dialog::from_context(&ctx(), true);
        assert!(dialog.key().is_none());
        assert_eq!(dialog.early_key(), "test-call-id:tag1");

        dialog.confirm(Some("tag2".to_string()), None, None);
        let key = dialog.key().unwrap();
        assert_eq!(key.to_string(), "test-call-id:tag1:tag2");
        assert!(dialog.is_confirmed());
    }

    #[test]
    fn test_version_bumps_on_events() {
        let mut dialog = Dialog::from_context(&ctx(), true);
        dialog.confirm(Some("tag2".to_string()), None, None);
        let v1 = dialog.version;
        dialog.set_last_response("SIP/2.0 200 OK\r\n\r\n".to_string());
        assert!(dialog.version > v1);
    }

    #[test]
    fn test_dialog_termination() {
        let mut dialog = Dialog::from_context(&ctx(), true);
        assert!(!dialog.is_terminated());
        dialog.terminate();
        assert!(dialog.is_terminated());
        assert_eq!(dialog.state, DialogState::Terminated);
    }
}
