use std::sync::Arc;

use super::ParserError;

/// CIGAR operation kinds the change parser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOpKind {
    /// Alignment match that may still hide mismatches (`M`, code 0).
    Match,
    /// Sequence match (`=`, code 7).
    SequenceMatch,
    /// Sequence mismatch (`X`, code 8).
    Mismatch,
    /// Insertion relative to the reference (`I`, code 1).
    Insertion,
    /// Deletion relative to the reference (`D`, code 2).
    Deletion,
    /// Soft clipping (sequence present in read only, `S`, code 4).
    SoftClip,
}

impl CigarOpKind {
    /// Decode a BAM operation code.
    pub fn from_code(code: u32) -> Result<Self, ParserError> {
        match code {
            0 => Ok(CigarOpKind::Match),
            1 => Ok(CigarOpKind::Insertion),
            2 => Ok(CigarOpKind::Deletion),
            4 => Ok(CigarOpKind::SoftClip),
            7 => Ok(CigarOpKind::SequenceMatch),
            8 => Ok(CigarOpKind::Mismatch),
            other => Err(ParserError::UnsupportedOperation { code: other }),
        }
    }

    /// BAM operation code.
    pub fn code(self) -> u32 {
        match self {
            CigarOpKind::Match => 0,
            CigarOpKind::Insertion => 1,
            CigarOpKind::Deletion => 2,
            CigarOpKind::SoftClip => 4,
            CigarOpKind::SequenceMatch => 7,
            CigarOpKind::Mismatch => 8,
        }
    }
}

/// CIGAR operation with length, kept in wire form until it is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    /// BAM operation code.
    pub code: u32,
    /// Number of bases affected by the operation.
    pub len: u32,
}

impl CigarOp {
    /// Construct a new CIGAR operation.
    pub fn new(kind: CigarOpKind, len: u32) -> Self {
        Self {
            code: kind.code(),
            len,
        }
    }

    /// Construct an operation from its raw code, which may be unsupported.
    pub fn from_raw(code: u32, len: u32) -> Self {
        Self { code, len }
    }

    /// Decode the operation kind.
    pub fn kind(&self) -> Result<CigarOpKind, ParserError> {
        CigarOpKind::from_code(self.code)
    }
}

/// Aligned read with sequence and quality information.
#[derive(Debug, Clone)]
pub struct AlignedRead {
    /// Read name (query name).
    pub name: Arc<str>,
    /// 0-based leftmost reference coordinate.
    pub pos: u32,
    /// CIGAR describing the alignment.
    pub cigar: Vec<CigarOp>,
    /// Read sequence stored as ASCII.
    pub sequence: Arc<[u8]>,
    /// Per-base quality scores in Phred space, when the read carries them.
    pub qualities: Option<Arc<[u8]>>,
}

impl AlignedRead {
    /// Construct a new aligned read wrapper.
    pub fn new(
        name: impl Into<Arc<str>>,
        pos: u32,
        cigar: Vec<CigarOp>,
        sequence: impl Into<Arc<[u8]>>,
        qualities: Option<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            pos,
            cigar,
            sequence: sequence.into(),
            qualities: qualities.map(Arc::from),
        }
    }

    /// Read length inferred from the sequence.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Returns `true` when the read has no bases.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Base at the provided read offset.
    pub fn base_at(&self, offset: usize) -> Option<u8> {
        self.sequence.get(offset).copied()
    }

    /// Quality score at the provided read offset.
    pub fn quality_at(&self, offset: usize) -> Option<u8> {
        self.qualities.as_ref()?.get(offset).copied()
    }

    /// Whether per-base qualities are available.
    pub fn has_qualities(&self) -> bool {
        self.qualities.is_some()
    }
}
