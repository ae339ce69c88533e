//! Base64 template decoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use shared_types::Template;

use super::errors::CodecError;

/// Default lower bound on decoded template size.
pub const DEFAULT_MIN_TEMPLATE_BYTES: usize = 8;

/// Default upper bound on decoded template size. R307-class sensors emit
/// 512-byte characteristic files, well inside this.
pub const DEFAULT_MAX_TEMPLATE_BYTES: usize = 4096;

/// Size limits on decoded templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecLimits {
    pub min_template_bytes: usize,
    pub max_template_bytes: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            min_template_bytes: DEFAULT_MIN_TEMPLATE_BYTES,
            max_template_bytes: DEFAULT_MAX_TEMPLATE_BYTES,
        }
    }
}

impl CodecLimits {
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.min_template_bytes == 0 {
            return Err(CodecError::InvalidLimits(
                "min_template_bytes must be at least 1".to_string(),
            ));
        }
        if self.min_template_bytes > self.max_template_bytes {
            return Err(CodecError::InvalidLimits(format!(
                "min_template_bytes ({}) exceeds max_template_bytes ({})",
                self.min_template_bytes, self.max_template_bytes
            )));
        }
        Ok(())
    }

    /// Longest base64 token that can still decode within `max_template_bytes`.
    pub fn max_token_len(&self) -> usize {
        self.max_template_bytes.div_ceil(3) * 4
    }
}

/// Decodes wire template tokens into [`Template`]s.
///
/// Accepts only the standard alphabet with canonical padding. Whitespace,
/// the URL-safe alphabet and non-zero trailing bits are all refused.
#[derive(Debug, Clone, Default)]
pub struct TemplateCodec {
    limits: CodecLimits,
}

impl TemplateCodec {
    pub fn new(limits: CodecLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &CodecLimits {
        &self.limits
    }

    pub fn decode(&self, token: &str) -> Result<Template, CodecError> {
        if token.is_empty() {
            return Err(CodecError::Empty);
        }
        // Refuse oversized tokens before allocating for them.
        if token.len() > self.limits.max_token_len() {
            return Err(CodecError::TooLarge {
                len: token.len() / 4 * 3,
                max: self.limits.max_template_bytes,
            });
        }

        let bytes = STANDARD
            .decode(token)
            .map_err(|e| CodecError::InvalidBase64(e.to_string()))?;

        if bytes.len() < self.limits.min_template_bytes {
            return Err(CodecError::TooShort {
                len: bytes.len(),
                min: self.limits.min_template_bytes,
            });
        }
        if bytes.len() > self.limits.max_template_bytes {
            return Err(CodecError::TooLarge {
                len: bytes.len(),
                max: self.limits.max_template_bytes,
            });
        }

        Template::new(bytes).map_err(|_| CodecError::Empty)
    }

    /// Encodes raw template bytes into the wire token.
    pub fn encode(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }
}
