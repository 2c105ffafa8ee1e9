use std::fmt;

use super::FormatError;

/// Number of canonical nucleotides tracked by the encoders.
pub const NUM_NUCLEOTIDES: usize = 4;

/// Letters indexed by numeric code (A=0, T=1, C=2, G=3).
const CODE_TO_SYMBOL: [char; NUM_NUCLEOTIDES] = ['A', 'T', 'C', 'G'];

/// Canonical nucleotide with the numeric coding used by matrix exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Nucleotide {
    /// Adenine.
    A = 0,
    /// Thymine.
    T = 1,
    /// Cytosine.
    C = 2,
    /// Guanine.
    G = 3,
}

impl Nucleotide {
    /// All nucleotides in code order.
    pub const ALL: [Nucleotide; NUM_NUCLEOTIDES] =
        [Nucleotide::A, Nucleotide::T, Nucleotide::C, Nucleotide::G];

    /// Parse a letter (`A`, `T`, `C`, `G`, either case) or a numeric code
    /// character (`0`..`3`).
    pub fn from_symbol(symbol: char) -> Result<Self, FormatError> {
        match symbol {
            'A' | 'a' | '0' => Ok(Nucleotide::A),
            'T' | 't' | '1' => Ok(Nucleotide::T),
            'C' | 'c' | '2' => Ok(Nucleotide::C),
            'G' | 'g' | '3' => Ok(Nucleotide::G),
            other => Err(FormatError::InvalidBase(other.to_string())),
        }
    }

    /// Parse an ASCII base as found in reads and references. Numeric codes are
    /// not accepted here.
    pub fn from_ascii(base: u8) -> Option<Self> {
        match base {
            b'A' | b'a' => Some(Nucleotide::A),
            b'T' | b't' => Some(Nucleotide::T),
            b'C' | b'c' => Some(Nucleotide::C),
            b'G' | b'g' => Some(Nucleotide::G),
            _ => None,
        }
    }

    /// Decode a numeric code.
    pub fn from_code(code: u8) -> Result<Self, FormatError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(FormatError::UnknownCode(code))
    }

    /// Numeric code of the nucleotide.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Index into per-nucleotide tables.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Uppercase letter for the nucleotide.
    #[inline]
    pub fn as_char(self) -> char {
        CODE_TO_SYMBOL[self.index()]
    }
}

impl fmt::Display for Nucleotide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
