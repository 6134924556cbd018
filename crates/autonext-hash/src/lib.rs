//! Perceptual frame fingerprints and the similarity metrics built on them.

pub mod fingerprint;
pub mod hasher;
pub mod similarity;

pub use fingerprint::{Fingerprint, FingerprintError};
pub use hasher::{ImageHasher, MEDIAN_PIVOT, THRESHOLD_PIVOT, median, median_with_pivot};
pub use similarity::{SimilarityError, similarity, similarity_by, weighted_similarity};
