//! Response lines.

use shared_types::{Decision, DecisionReason, TransportOrigin};

use super::errors::ParseError;

/// How much detail a transport gets back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStyle {
    /// `YES` / `NO` / `ERROR`. What gate controllers on serial lines expect.
    Word,
    /// `<WORD>:<REASON>`.
    Structured,
}

impl ResponseStyle {
    pub fn for_origin(origin: TransportOrigin) -> Self {
        match origin {
            TransportOrigin::Tcp => ResponseStyle::Structured,
            TransportOrigin::Cli | TransportOrigin::Serial => ResponseStyle::Word,
        }
    }
}

/// First word of a response line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseToken {
    Yes,
    No,
    Error,
}

impl ResponseToken {
    pub fn for_decision(decision: &Decision) -> Self {
        if decision.granted() {
            ResponseToken::Yes
        } else if decision.reason().is_rejection() {
            ResponseToken::Error
        } else {
            ResponseToken::No
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            ResponseToken::Yes => "YES",
            ResponseToken::No => "NO",
            ResponseToken::Error => "ERROR",
        }
    }
}

/// Serializes a decision into a terminated response line.
pub fn serialize_response(decision: &Decision, style: ResponseStyle) -> Vec<u8> {
    let token = ResponseToken::for_decision(decision);
    let line = match style {
        ResponseStyle::Word => format!("{}\n", token.as_str()),
        ResponseStyle::Structured => format!("{}:{}\n", token.as_str(), decision.reason()),
    };
    line.into_bytes()
}

/// A response line as read back by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedResponse {
    pub token: ResponseToken,
    /// Present for structured responses.
    pub reason: Option<DecisionReason>,
}

impl ParsedResponse {
    pub fn granted(&self) -> bool {
        self.token == ResponseToken::Yes
    }
}

/// Reference client parser, accepting either style.
pub fn parse_response(raw: &[u8]) -> Result<ParsedResponse, ParseError> {
    let text = std::str::from_utf8(raw)
        .map_err(|_| ParseError::MalformedFrame("response is not valid UTF-8".to_string()))?;
    let text = text.trim_end_matches(['\r', '\n']);

    let (word, reason) = match text.split_once(':') {
        Some((word, reason)) => {
            let reason = DecisionReason::from_wire(reason).ok_or_else(|| {
                ParseError::MalformedFrame(format!("unknown reason {reason:?}"))
            })?;
            (word, Some(reason))
        }
        None => (text, None),
    };

    let token = match word {
        "YES" => ResponseToken::Yes,
        "NO" => ResponseToken::No,
        "ERROR" => ResponseToken::Error,
        other => {
            return Err(ParseError::MalformedFrame(format!(
                "unknown response token {other:?}"
            )))
        }
    };
    Ok(ParsedResponse { token, reason })
}
