//! Serialized response re-parsing
//!
//! Stored dialog snapshots carry the last response as serialized text. When a
//! dialog is resurrected on another node that text must become a live message
//! again; this parser recovers the status line and headers. The body is kept
//! verbatim, the engine re-interprets it.

use nom::{
    bytes::complete::{take_till, take_till1},
    character::complete::{char, digit1},
    combinator::{map, map_res, opt, verify},
    sequence::preceded,
    IResult,
};

use super::ProtocolError;

/// Parsed SIP response status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub version: String,
    pub code: u16,
    pub reason: String,
}

/// Parser for `SIP-Version SP Status-Code SP Reason-Phrase`
pub fn parse_status_line(input: &str) -> IResult<&str, StatusLine> {
    let (input, version) = verify(take_till1(|c| c == ' '), |s: &str| s.starts_with("SIP/"))(input)?;
    let (input, code) = preceded(char(' '), map_res(digit1, |s: &str| s.parse::<u16>()))(input)?;
    if !(100..=699).contains(&code) {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    let (input, reason) = map(
        opt(preceded(char(' '), take_till(|c| c == '\r' || c == '\n'))),
        |r: Option<&str>| r.unwrap_or("").to_string(),
    )(input)?;

    Ok((
        input,
        StatusLine {
            version: version.to_string(),
            code,
            reason,
        },
    ))
}

/// A re-parsed serialized response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusLine,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Response {
    /// Parse a serialized response back into a structured message.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let mut lines = raw.split("\r\n").flat_map(|l| l.split('\n'));
        let first = lines
            .next()
            .ok_or_else(|| ProtocolError::InvalidMessage("empty message".into()))?;
        let (_, status) = parse_status_line(first)
            .map_err(|_| ProtocolError::InvalidStatusLine(first.to_string()))?;

        let mut headers: Vec<(String, String)> = Vec::new();
        let mut body = String::new();
        let mut in_body = false;
        for line in lines {
            if in_body {
                if !body.is_empty() {
                    body.push_str("\r\n");
                }
                body.push_str(line);
                continue;
            }
            if line.is_empty() {
                in_body = true;
                continue;
            }
            if (line.starts_with(' ') || line.starts_with('\t')) && !headers.is_empty() {
                // folded continuation line
                let last = headers.last_mut().unwrap();
                last.1.push(' ');
                last.1.push_str(line.trim());
                continue;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ProtocolError::InvalidMessage(line.to_string()))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        Ok(Response {
            status,
            headers,
            body,
        })
    }

    /// Case-insensitive header lookup, first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "SIP/2.0 200 OK\r\nVia: SIP/2.0/UDP 10.0.0.1:5060;branch=z9hG4bK776asdhds\r\nTo: <sip:bob@example.com>;tag=b2\r\nFrom: <sip:alice@example.com>;tag=a1\r\nCall-ID: abc123\r\nContact: <sip:bob@10.0.0.2:5060>\r\n\r\nv=0";

    #[test]
    fn test_parse_full_response() {
        let resp = Response::parse(RAW).unwrap();
        assert_eq!(resp.status.code, 200);
        assert_eq!(resp.status.reason, "OK");
        assert_eq!(resp.header("call-id"), Some("abc123"));
        assert_eq!(resp.header("Contact"), Some("<sip:bob@10.0.0.2:5060>"));
        assert_eq!(resp.body, "v=0");
    }

    #[test]
    fn test_status_line_without_reason() {
        let (_, status) = parse_status_line("SIP/2.0 180").unwrap();
        assert_eq!(status.code, 180);
        assert_eq!(status.reason, "");
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(Response::parse("not a sip message").is_err());
        assert!(parse_status_line("SIP/2.0 999 Nope").is_err());
    }
}
