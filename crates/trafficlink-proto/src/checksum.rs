//! Frame integrity checksums.
//!
//! Controllers in the field use one of two schemes, or none at all. Both are
//! computed over the masked payload bytes; the delimiters are never included.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Checksum scheme appended to a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumMode {
    /// No checksum byte.
    #[default]
    None,
    /// XOR of all payload bytes, masked to 7 bits.
    Xor7,
    /// Sum of all payload bytes modulo 256.
    Sum8,
}

impl ChecksumMode {
    /// Compute the checksum byte for `payload`, or `None` for [`ChecksumMode::None`].
    pub fn compute(self, payload: &[u8]) -> Option<u8> {
        match self {
            Self::None => None,
            Self::Xor7 => Some(xor7(payload)),
            Self::Sum8 => Some(sum8(payload)),
        }
    }

    /// Number of bytes this mode adds to a frame.
    pub fn len(self) -> usize {
        usize::from(self != Self::None)
    }

    /// Returns true if the mode adds no bytes.
    pub fn is_empty(self) -> bool {
        self == Self::None
    }
}

impl fmt::Display for ChecksumMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Xor7 => "xor7",
            Self::Sum8 => "sum8",
        };
        f.write_str(name)
    }
}

impl FromStr for ChecksumMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "xor7" | "xor" => Ok(Self::Xor7),
            "sum8" | "sum" => Ok(Self::Sum8),
            other => Err(format!("unknown checksum mode: {other}")),
        }
    }
}

/// XOR of all bytes, masked to the range 0..=127.
pub fn xor7(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, &b| acc ^ b) & 0x7F
}

/// Arithmetic sum of all bytes modulo 256.
pub fn sum8(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}
