//! Dialog snapshot codec
//!
//! `to_snapshot` pulls the replicable fields off a live dialog. `from_snapshot`
//! is the hard direction: it re-parses the serialized last response and the
//! stored contact into live objects, binds the dialog to one of the *local*
//! node's listening points (the original node's sockets are gone), and builds
//! a dialog shell able to carry further messages. `apply_snapshot` is the
//! in-place variant used when reconciling a live dialog against a strictly
//! newer stored version.

use std::collections::BTreeMap;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::dialog::{Dialog, DialogKey, DialogState};
use crate::engine::{LocalEndpoints, Transport};
use crate::errors::{ReconstructionError, ReconstructionResult};
use crate::protocol::{parse_contact, Response, Uri};

use super::{keys, DialogSnapshot};

/// Pull the currently-replicable fields off a live dialog.
///
/// Application data is included only when the dialog's policy flag allows it.
pub fn to_snapshot(dialog: &Dialog) -> DialogSnapshot {
    let mut metadata = BTreeMap::new();

    if let Some(tag) = &dialog.local_tag {
        metadata.insert(keys::LOCAL_TAG.to_string(), tag.clone());
    }
    if let Some(tag) = &dialog.remote_tag {
        metadata.insert(keys::REMOTE_TAG.to_string(), tag.clone());
    }
    metadata.insert(keys::LOCAL_URI.to_string(), dialog.local_uri.to_string());
    metadata.insert(keys::REMOTE_URI.to_string(), dialog.remote_uri.to_string());
    metadata.insert(
        keys::REMOTE_TARGET.to_string(),
        dialog.remote_target.to_string(),
    );
    let routes: Vec<String> = dialog.route_set.iter().map(ToString::to_string).collect();
    metadata.insert(
        keys::ROUTE_SET.to_string(),
        serde_json::to_string(&routes).unwrap_or_else(|_| "[]".to_string()),
    );
    if let Some(raw) = &dialog.last_response {
        metadata.insert(keys::LAST_RESPONSE.to_string(), raw.clone());
    }
    metadata.insert(keys::STATE.to_string(), dialog.state.to_string());
    metadata.insert(keys::VERSION.to_string(), dialog.version.to_string());
    if let Some(transport) = dialog.transport {
        metadata.insert(keys::TRANSPORT.to_string(), transport.to_string());
    }
    metadata.insert(
        keys::IS_INITIATOR.to_string(),
        dialog.is_initiator.to_string(),
    );

    let application_data = if dialog.replicate_application_data {
        dialog.application_data.clone()
    } else {
        None
    };

    DialogSnapshot {
        metadata,
        application_data,
        version: dialog.version,
    }
}

/// Reconstruct a live dialog from a stored snapshot.
pub fn from_snapshot(
    key: &DialogKey,
    snapshot: &DialogSnapshot,
    endpoints: &dyn LocalEndpoints,
) -> ReconstructionResult<Dialog> {
    let raw_key = key.to_string();
    let meta = &snapshot.metadata;

    let required = |field: &'static str| -> ReconstructionResult<&String> {
        meta.get(field).ok_or(ReconstructionError::MissingField {
            key: raw_key.clone(),
            field,
        })
    };
    let malformed = |field: &'static str, detail: String| ReconstructionError::MalformedField {
        key: raw_key.clone(),
        field,
        detail,
    };

    let local_uri: Uri = required(keys::LOCAL_URI)?
        .parse()
        .map_err(|e| malformed(keys::LOCAL_URI, format!("{}", e)))?;
    let remote_uri: Uri = required(keys::REMOTE_URI)?
        .parse()
        .map_err(|e| malformed(keys::REMOTE_URI, format!("{}", e)))?;

    // Contact header re-parsed into a live header object
    let remote_target =
        parse_contact(required(keys::REMOTE_TARGET)?).map_err(|e| {
            ReconstructionError::MalformedContact {
                key: raw_key.clone(),
                detail: format!("{}", e),
            }
        })?;

    // The serialized last response must parse back into a live message
    let last_response = match meta.get(keys::LAST_RESPONSE) {
        Some(raw) => {
            Response::parse(raw).map_err(|e| ReconstructionError::MalformedResponse {
                key: raw_key.clone(),
                detail: format!("{}", e),
            })?;
            Some(raw.clone())
        }
        None => None,
    };

    let route_set: Vec<Uri> = match meta.get(keys::ROUTE_SET) {
        Some(raw) => {
            let routes: Vec<String> = serde_json::from_str(raw)
                .map_err(|e| malformed(keys::ROUTE_SET, e.to_string()))?;
            routes
                .iter()
                .map(|r| r.parse())
                .collect::<Result<Vec<Uri>, _>>()
                .map_err(|e| malformed(keys::ROUTE_SET, format!("{}", e)))?
        }
        None => Vec::new(),
    };

    let transport = match meta.get(keys::TRANSPORT) {
        Some(raw) => Transport::from_str(raw).map_err(|e| malformed(keys::TRANSPORT, e))?,
        None => Transport::Udp,
    };
    // Bind to the local node's listening point, not the original node's
    let channel = endpoints
        .channel_for(transport)
        .ok_or(ReconstructionError::NoLocalEndpoint(transport))?;

    let state = meta
        .get(keys::STATE)
        .and_then(|s| DialogState::from_str(s).ok())
        .unwrap_or(DialogState::Confirmed);

    let is_initiator = meta
        .get(keys::IS_INITIATOR)
        .map(|s| s == "true")
        .unwrap_or(false);

    debug!(key = %raw_key, version = snapshot.version, "reconstructed dialog from snapshot");

    Ok(Dialog {
        call_id: key.call_id.clone(),
        local_tag: Some(key.local_tag.clone()),
        remote_tag: Some(key.remote_tag.clone()),
        local_uri,
        remote_uri,
        remote_target,
        route_set,
        last_response,
        state,
        version: snapshot.version,
        transport: Some(transport),
        is_initiator,
        application_data: snapshot.application_data.clone(),
        replicate_application_data: snapshot.application_data.is_some(),
        channel: Some(channel),
    })
}

/// Overwrite a live dialog's replicated fields from a strictly newer
/// snapshot. Callers check the version ordering; this only applies fields.
/// Unparsable incoming fields are logged and left unchanged rather than
/// corrupting a working dialog.
pub fn apply_snapshot(dialog: &mut Dialog, snapshot: &DialogSnapshot) {
    let meta = &snapshot.metadata;

    if let Some(tag) = meta.get(keys::LOCAL_TAG) {
        dialog.local_tag = Some(tag.clone());
    }
    if let Some(tag) = meta.get(keys::REMOTE_TAG) {
        dialog.remote_tag = Some(tag.clone());
    }
    if let Some(raw) = meta.get(keys::REMOTE_TARGET) {
        match parse_contact(raw) {
            Ok(uri) => dialog.remote_target = uri,
            Err(e) => warn!(call_id = %dialog.call_id, error = %e, "ignoring malformed remote target in newer snapshot"),
        }
    }
    if let Some(raw) = meta.get(keys::ROUTE_SET) {
        if let Ok(routes) = serde_json::from_str::<Vec<String>>(raw) {
            if let Ok(parsed) = routes.iter().map(|r| r.parse()).collect::<Result<Vec<Uri>, _>>() {
                dialog.route_set = parsed;
            }
        }
    }
    if let Some(raw) = meta.get(keys::LAST_RESPONSE) {
        dialog.last_response = Some(raw.clone());
    }
    if let Some(raw) = meta.get(keys::STATE) {
        if let Ok(state) = DialogState::from_str(raw) {
            dialog.state = state;
        }
    }
    if snapshot.application_data.is_some() {
        dialog.application_data = snapshot.application_data.clone();
    }
    dialog.version = snapshot.version;
}
