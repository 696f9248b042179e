//! SIP URI parsing
//!
//! A deliberately small URI model: scheme, user, host, port and a raw
//! parameter tail. The replication core only needs to round-trip URIs through
//! snapshots and hand them back to the engine; it never routes on them.

use std::fmt;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till1, take_until},
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res, opt, rest},
    sequence::{delimited, preceded, terminated},
    IResult,
};
use serde::{Deserialize, Serialize};

use super::ProtocolError;

/// A SIP or SIPS URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uri {
    pub scheme: String,
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    /// Raw parameter tail after the first `;`, unparsed.
    pub params: Option<String>,
}

/// Parser for `scheme ":" [user "@"] host [":" port] [";" params]`
fn uri_parts(input: &str) -> IResult<&str, Uri> {
    let (input, scheme) = terminated(alt((tag("sips"), tag("sip"))), char(':'))(input)?;
    let (input, user) = opt(terminated(take_until("@"), char('@')))(input)?;
    let (input, host) = take_till1(|c| c == ':' || c == ';')(input)?;
    let (input, port) = opt(preceded(
        char(':'),
        map_res(digit1, |s: &str| s.parse::<u16>()),
    ))(input)?;
    let (input, params) = opt(preceded(char(';'), rest))(input)?;

    Ok((
        input,
        Uri {
            scheme: scheme.to_string(),
            user: user.filter(|u| !u.is_empty()).map(str::to_string),
            host: host.to_string(),
            port,
            params: params.filter(|p| !p.is_empty()).map(str::to_string),
        },
    ))
}

impl FromStr for Uri {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        all_consuming(uri_parts)(trimmed)
            .map(|(_, uri)| uri)
            .map_err(|_| ProtocolError::InvalidUri(trimmed.to_string()))
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        if let Some(params) = &self.params {
            write!(f, ";{}", params)?;
        }
        Ok(())
    }
}

/// Parser for the angle-quoted form `[display] "<" uri ">"`
fn angle_quoted(input: &str) -> IResult<&str, &str> {
    preceded(
        take_until("<"),
        delimited(char('<'), take_until(">"), char('>')),
    )(input)
}

/// Extract the URI from a Contact header value.
///
/// Handles both `"Alice" <sip:alice@host>;expires=60` and the bare
/// `sip:alice@host` form; in the bare form everything after the first `;`
/// is a header parameter and is dropped.
pub fn parse_contact(value: &str) -> Result<Uri, ProtocolError> {
    let trimmed = value.trim();
    if let Ok((_, inner)) = angle_quoted(trimmed) {
        return inner.parse();
    }
    let bare = trimmed.split(';').next().unwrap_or(trimmed).trim();
    bare.parse()
}
