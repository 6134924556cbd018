use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const BITS_PER_WORD: usize = 64;

#[derive(Debug, Error, PartialEq)]
pub enum FingerprintError {
    #[error("bit count {actual} does not match {rows}x{cols}")]
    BitCount { rows: u32, cols: u32, actual: usize },
    #[error("luma plane length {data_len} is smaller than width * height ({required})")]
    InsufficientData { data_len: usize, required: usize },
    #[error("luma plane dimensions {width}x{height} are empty")]
    EmptyPlane { width: usize, height: usize },
    #[error("malformed fingerprint encoding: {0}")]
    Decode(String),
}

/// Packed bit grid derived from a downsampled grayscale frame.
///
/// Bit `i` covers cell `(i / cols, i % cols)` and lives at bit `i % 64` of
/// word `i / 64`. Bits past `rows * cols` in the last word are always zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    rows: u32,
    cols: u32,
    words: Vec<u64>,
}

impl Fingerprint {
    pub fn zeroed(rows: u32, cols: u32) -> Self {
        let len = rows as usize * cols as usize;
        Self {
            rows,
            cols,
            words: vec![0; len.div_ceil(BITS_PER_WORD)],
        }
    }

    pub fn from_bits(
        rows: u32,
        cols: u32,
        bits: impl IntoIterator<Item = bool>,
    ) -> Result<Self, FingerprintError> {
        let mut print = Self::zeroed(rows, cols);
        let mut count = 0;
        for (index, bit) in bits.into_iter().enumerate() {
            count = index + 1;
            if count > print.len() {
                break;
            }
            if bit {
                print.set_bit(index);
            }
        }
        if count != print.len() {
            return Err(FingerprintError::BitCount {
                rows,
                cols,
                actual: count,
            });
        }
        Ok(print)
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bit(&self, index: usize) -> bool {
        assert!(index < self.len(), "bit index {index} out of range");
        self.words[index / BITS_PER_WORD] >> (index % BITS_PER_WORD) & 1 == 1
    }

    pub fn set_bit(&mut self, index: usize) {
        assert!(index < self.len(), "bit index {index} out of range");
        self.words[index / BITS_PER_WORD] |= 1 << (index % BITS_PER_WORD);
    }

    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len()).map(|index| self.bit(index))
    }

    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|word| word.count_ones()).sum()
    }

    /// True when no bit is set at all.
    pub fn is_blank(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    pub(crate) fn words(&self) -> &[u64] {
        &self.words
    }

    /// Compact string form: `ROWSxCOLS:` followed by the packed bits in
    /// base64. Lossless, see [`Fingerprint::decode`].
    pub fn encode(&self) -> String {
        let total_bytes = self.len().div_ceil(8);
        let mut bytes = Vec::with_capacity(self.words.len() * 8);
        for word in &self.words {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes.truncate(total_bytes);
        format!("{}x{}:{}", self.rows, self.cols, STANDARD.encode(&bytes))
    }

    pub fn decode(encoded: &str) -> Result<Self, FingerprintError> {
        let (dims, payload) = encoded
            .split_once(':')
            .ok_or_else(|| FingerprintError::Decode("missing ':' separator".into()))?;
        let (rows, cols) = dims
            .split_once('x')
            .ok_or_else(|| FingerprintError::Decode("missing 'x' in dimensions".into()))?;
        let rows: u32 = rows
            .parse()
            .map_err(|_| FingerprintError::Decode(format!("bad row count '{rows}'")))?;
        let cols: u32 = cols
            .parse()
            .map_err(|_| FingerprintError::Decode(format!("bad column count '{cols}'")))?;
        let bytes = STANDARD
            .decode(payload)
            .map_err(|err| FingerprintError::Decode(err.to_string()))?;

        let mut print = Self::zeroed(rows, cols);
        let total_bytes = print.len().div_ceil(8);
        if bytes.len() != total_bytes {
            return Err(FingerprintError::Decode(format!(
                "payload holds {} bytes, {rows}x{cols} needs {total_bytes}",
                bytes.len()
            )));
        }
        for (index, byte) in bytes.iter().enumerate() {
            print.words[index / 8] |= u64::from(*byte) << (index % 8 * 8);
        }
        let tail_bits = print.len() % BITS_PER_WORD;
        if tail_bits != 0
            && let Some(last) = print.words.last()
            && last >> tail_bits != 0
        {
            return Err(FingerprintError::Decode(
                "set bits past the fingerprint length".into(),
            ));
        }
        Ok(print)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EncodedVisitor;

        impl Visitor<'_> for EncodedVisitor {
            type Value = Fingerprint;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 'ROWSxCOLS:base64' fingerprint string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                Fingerprint::decode(value).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(EncodedVisitor)
    }
}
