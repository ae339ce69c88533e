//! Request frames.

use bq_01_template_codec::{normalize, TemplateCodec};
use chrono::{DateTime, Utc};
use shared_types::{FingerPosition, QueryRequest, TransportOrigin};

use super::errors::ParseError;

/// The only accepted command keyword. Matched exactly.
pub const QUERY_KEYWORD: &str = "QUERY";

/// Field separator.
pub const FIELD_SEPARATOR: char = ':';

/// Largest frame a transport buffers, terminator included.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 8192;

/// Longest untrusted token echoed back inside an error.
const MAX_ECHO_CHARS: usize = 32;

/// The three fields of a split frame, borrowed from the raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFields<'a> {
    pub keyword: &'a str,
    pub template: &'a str,
    pub finger: &'a str,
}

/// RECEIVED → PARSED: checks encoding, field count and keyword.
///
/// One trailing `\n` or `\r\n` and surrounding ASCII whitespace are removed
/// before splitting. Whitespace inside the frame is kept and will fail
/// validation of the field it lands in.
pub fn split_frame(raw: &[u8]) -> Result<FrameFields<'_>, ParseError> {
    let text = std::str::from_utf8(raw)
        .map_err(|_| ParseError::MalformedFrame("frame is not valid UTF-8".to_string()))?;
    let text = text.trim_matches(|c: char| c.is_ascii_whitespace());
    if text.is_empty() {
        return Err(ParseError::MalformedFrame("empty frame".to_string()));
    }

    let fields: Vec<&str> = text.split(FIELD_SEPARATOR).collect();
    let [keyword, template, finger] = fields.as_slice() else {
        return Err(ParseError::MalformedFrame(format!(
            "expected 3 fields, found {}",
            fields.len()
        )));
    };

    if *keyword != QUERY_KEYWORD {
        return Err(ParseError::UnknownCommand(excerpt(keyword)));
    }

    Ok(FrameFields {
        keyword: *keyword,
        template: *template,
        finger: *finger,
    })
}

/// PARSED → VALIDATED: decodes the template and checks the finger.
pub fn validate_fields(
    fields: &FrameFields<'_>,
    origin: TransportOrigin,
    received_at: DateTime<Utc>,
    codec: &TemplateCodec,
) -> Result<QueryRequest, ParseError> {
    let template = codec.decode(fields.template)?;
    let claimed_finger =
        normalize(fields.finger).map_err(|e| ParseError::InvalidFinger(excerpt(&e.token)))?;

    Ok(QueryRequest {
        template,
        claimed_finger,
        transport_origin: origin,
        received_at,
    })
}

/// Both stages in one call.
pub fn parse_frame(
    raw: &[u8],
    origin: TransportOrigin,
    received_at: DateTime<Utc>,
    codec: &TemplateCodec,
) -> Result<QueryRequest, ParseError> {
    let fields = split_frame(raw)?;
    validate_fields(&fields, origin, received_at, codec)
}

/// Builds a request frame (without terminator) for clients.
pub fn encode_query_frame(template: &[u8], finger: FingerPosition) -> String {
    format!(
        "{QUERY_KEYWORD}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
        TemplateCodec::encode(template),
        finger
    )
}

fn excerpt(token: &str) -> String {
    token.chars().take(MAX_ECHO_CHARS).collect()
}
