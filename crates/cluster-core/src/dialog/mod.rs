//! Dialog model for the replication core
//!
//! Contains the dialog identifier with its established-dialog heuristic, the
//! dialog state machine, and the single policy-parameterized dialog value
//! type used for every replication strategy.

pub mod dialog_impl;
pub mod dialog_key;
pub mod dialog_state;

pub use dialog_impl::{Dialog, DialogContext, SharedDialog};
pub use dialog_key::{early_key, DialogKey, KEY_SEPARATOR};
pub use dialog_state::DialogState;
