use thiserror::Error;

use crate::fingerprint::Fingerprint;

#[derive(Debug, Error, PartialEq)]
pub enum SimilarityError {
    #[error("cannot compare empty fingerprints")]
    Empty,
    #[error("fingerprint lengths differ ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },
}

fn ensure_comparable(a: &Fingerprint, b: &Fingerprint) -> Result<(), SimilarityError> {
    if a.is_empty() || b.is_empty() {
        return Err(SimilarityError::Empty);
    }
    if a.len() != b.len() {
        return Err(SimilarityError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(())
}

/// Fraction of bit positions where both fingerprints agree.
///
/// Symmetric; 1.0 for identical fingerprints, 0.0 for complements.
pub fn similarity(a: &Fingerprint, b: &Fingerprint) -> Result<f64, SimilarityError> {
    ensure_comparable(a, b)?;
    let disagreements: u32 = a
        .words()
        .iter()
        .zip(b.words())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum();
    Ok((a.len() - disagreements as usize) as f64 / a.len() as f64)
}

/// [`similarity`] with a caller-supplied per-position predicate.
pub fn similarity_by(
    a: &Fingerprint,
    b: &Fingerprint,
    compare: impl Fn(bool, bool) -> bool,
) -> Result<f64, SimilarityError> {
    ensure_comparable(a, b)?;
    let matches = a.bits().zip(b.bits()).filter(|&(x, y)| compare(x, y)).count();
    Ok(matches as f64 / a.len() as f64)
}

/// Agreement restricted to positions where either fingerprint has a set bit,
/// so large blank areas cannot inflate the score.
///
/// A `current` with no set bits scores 1.0 outright: a fully featureless
/// frame reads as a static credits frame. The metric is therefore
/// asymmetric, unlike [`similarity`].
pub fn weighted_similarity(
    reference: &Fingerprint,
    current: &Fingerprint,
) -> Result<f64, SimilarityError> {
    ensure_comparable(reference, current)?;
    if current.is_blank() {
        return Ok(1.0);
    }
    let mut active = 0u32;
    let mut agreeing = 0u32;
    for (x, y) in reference.words().iter().zip(current.words()) {
        active += (x | y).count_ones();
        agreeing += (x & y).count_ones();
    }
    Ok(f64::from(agreeing) / f64::from(active))
}
