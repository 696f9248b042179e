//! Minimal protocol surface for snapshot reconstruction
//!
//! The full SIP parser lives in the protocol engine; this module carries only
//! the fragments the snapshot codec needs to resurrect a stored dialog or
//! transaction: the status line of a serialized response, the Contact header,
//! and SIP URI handling.

pub mod response;
pub mod uri;

pub use response::{parse_status_line, Response, StatusLine};
pub use uri::{parse_contact, Uri};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parse failures for the protocol fragments handled here.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("Invalid status line: {0}")]
    InvalidStatusLine(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

/// SIP request method.
///
/// Only INVITE is special-cased by the replication core (it is the only
/// method whose transactions replicate); everything else passes through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Invite,
    Ack,
    Bye,
    Cancel,
    Options,
    Register,
    Subscribe,
    Notify,
    Info,
    Update,
    Other(String),
}

impl FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "INVITE" => Method::Invite,
            "ACK" => Method::Ack,
            "BYE" => Method::Bye,
            "CANCEL" => Method::Cancel,
            "OPTIONS" => Method::Options,
            "REGISTER" => Method::Register,
            "SUBSCRIBE" => Method::Subscribe,
            "NOTIFY" => Method::Notify,
            "INFO" => Method::Info,
            "UPDATE" => Method::Update,
            other => Method::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Invite => write!(f, "INVITE"),
            Method::Ack => write!(f, "ACK"),
            Method::Bye => write!(f, "BYE"),
            Method::Cancel => write!(f, "CANCEL"),
            Method::Options => write!(f, "OPTIONS"),
            Method::Register => write!(f, "REGISTER"),
            Method::Subscribe => write!(f, "SUBSCRIBE"),
            Method::Notify => write!(f, "NOTIFY"),
            Method::Info => write!(f, "INFO"),
            Method::Update => write!(f, "UPDATE"),
            Method::Other(m) => write!(f, "{}", m),
        }
    }
}
