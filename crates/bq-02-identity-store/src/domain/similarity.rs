//! Template similarity.
//!
//! Templates are compared bit for bit: the score is the fraction of equal
//! bits. Templates of different length are never similar. Identical
//! templates score exactly 1.0.

use shared_types::{MatchCandidate, Template};

use super::entities::EnrolledTemplate;
use super::errors::StoreError;

/// Fraction of equal bits between two templates, in `[0, 1]`.
pub fn similarity(probe: &[u8], enrolled: &[u8]) -> f64 {
    if probe.is_empty() || probe.len() != enrolled.len() {
        return 0.0;
    }
    let differing: u64 = probe
        .iter()
        .zip(enrolled)
        .map(|(a, b)| u64::from((a ^ b).count_ones()))
        .sum();
    let total_bits = probe.len() as f64 * 8.0;
    1.0 - differing as f64 / total_bits
}

/// Scores every enrolled template of the probe's length.
pub fn score_enrolled<'a>(
    probe: &Template,
    enrolled: impl IntoIterator<Item = &'a EnrolledTemplate>,
) -> Result<Vec<MatchCandidate>, StoreError> {
    enrolled
        .into_iter()
        .filter(|e| e.template.len() == probe.len())
        .map(|e| {
            MatchCandidate::new(
                e.identity_id,
                e.template_id,
                similarity(probe.as_bytes(), &e.template),
                e.finger,
            )
            .map_err(|err| StoreError::InvalidRow(format!("template {}: {err}", e.template_id)))
        })
        .collect()
}
