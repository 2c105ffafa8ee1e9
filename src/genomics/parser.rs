//! Extraction of per-read changes from aligned reads.
//!
//! Each read is walked operation by operation with two cursors, one into the
//! read bases and one into the reference:
//!
//! | op | read cursor | reference cursor | emits |
//! |----|-------------|------------------|-------|
//! | `=` | +len | +len | nothing |
//! | `M` | +len | +len | substitutions when match comparison is enabled |
//! | `X` | +len | +len | one substitution per differing base |
//! | `D` | - | +len | one deletion |
//! | `I` | +len | - | one insertion anchored at the reference cursor |
//! | `S` | +len | - | nothing |
//!
//! Any other operation aborts the scan.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::genomics::{AlignedRead, CigarOpKind};
use crate::haplotype::{Change, Mutation, Nucleotide};

/// Quality assigned to changes from reads without per-base qualities.
pub const DEFAULT_QUALITY: f32 = 255.0;
/// Quality assigned to deletions, which have no single base quality.
pub const DELETION_QUALITY: f32 = 0.0;

/// Errors raised while walking alignments.
#[derive(Debug, Error)]
pub enum ParserError {
    /// CIGAR operation code outside the supported set.
    #[error("unsupported CIGAR operation code {code}")]
    UnsupportedOperation {
        /// Raw BAM operation code.
        code: u32,
    },

    /// CIGAR consumes more read bases than the read has.
    #[error("CIGAR walks past the read end (offset {offset}, read length {len})")]
    ReadOverrun {
        /// Read offset that was requested.
        offset: usize,
        /// Read length.
        len: usize,
    },

    /// CIGAR compares bases beyond the reference end.
    #[error("CIGAR walks past the reference end (position {position}, reference length {len})")]
    ReferenceOverrun {
        /// Reference position that was requested.
        position: usize,
        /// Reference length.
        len: usize,
    },

    /// Failure attributed to a specific read of an alignment.
    #[error("read {read_id} ({name}): {source}")]
    InRead {
        /// Index of the read within the alignment stream.
        read_id: usize,
        /// Read name.
        name: String,
        /// Underlying failure.
        #[source]
        source: Box<ParserError>,
    },
}

/// Filtering and defaults applied while extracting changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserConfig {
    /// Keep only changes with quality strictly above this value.
    pub quality_threshold: Option<f32>,
    /// Skip reads whose length differs from the reference by more than this.
    pub length_threshold: Option<usize>,
    /// Quality used when a read carries no per-base qualities.
    pub default_quality: f32,
    /// Compare bases inside `M` operations as if they were `X` operations.
    pub compare_matches: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            quality_threshold: None,
            length_threshold: None,
            default_quality: DEFAULT_QUALITY,
            compare_matches: false,
        }
    }
}

impl ParserConfig {
    /// Enable the quality filter; a non-positive threshold disables it.
    pub fn with_quality_threshold(mut self, threshold: f32) -> Self {
        self.quality_threshold = (threshold > 0.0).then_some(threshold);
        self
    }

    /// Enable the read-length filter; a negative threshold disables it.
    pub fn with_length_threshold(mut self, threshold: i64) -> Self {
        self.length_threshold = usize::try_from(threshold).ok();
        self
    }

    /// Override the quality used for reads without qualities.
    pub fn with_default_quality(mut self, quality: f32) -> Self {
        self.default_quality = quality;
        self
    }

    /// Toggle base comparison inside `M` operations.
    pub fn with_match_comparison(mut self, enabled: bool) -> Self {
        self.compare_matches = enabled;
        self
    }

    fn accepts_length(&self, read_len: usize, reference_len: usize) -> bool {
        self.length_threshold
            .map_or(true, |threshold| read_len.abs_diff(reference_len) <= threshold)
    }

    fn retains(&self, quality: f32) -> bool {
        self.quality_threshold
            .map_or(true, |threshold| quality > threshold)
    }
}

/// One detected change in one read.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    /// Index of the originating read in the alignment stream.
    pub read_id: usize,
    /// Block identifier parsed from the read name.
    pub block_id: Option<Arc<str>>,
    /// Detected change.
    pub change: Change,
    /// Base quality (mean for insertions, 0 for deletions).
    pub quality: f32,
}

impl ChangeRecord {
    /// Reference position of the change.
    pub fn position(&self) -> usize {
        self.change.position
    }

    /// Mutation in string form.
    pub fn mutation(&self) -> String {
        self.change.mutation.to_string()
    }
}

/// Changes collected over a whole alignment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeTable {
    /// Change rows in read order.
    pub records: Vec<ChangeRecord>,
    /// Number of reads scanned, including reads without changes.
    pub n_seq: usize,
    /// Number of reads scanned per block identifier.
    pub block_reads: BTreeMap<Option<Arc<str>>, usize>,
}

impl ChangeTable {
    /// Number of change rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when no changes were retained.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct reads contributing at least one change.
    pub fn reads_with_changes(&self) -> usize {
        self.records
            .iter()
            .map(|record| record.read_id)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Copy of the table keeping only changes with quality above `threshold`.
    pub fn retain_quality_above(&self, threshold: f32) -> ChangeTable {
        ChangeTable {
            records: self
                .records
                .iter()
                .filter(|record| record.quality > threshold)
                .cloned()
                .collect(),
            n_seq: self.n_seq,
            block_reads: self.block_reads.clone(),
        }
    }
}

fn block_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"block_id=([^;]+);").expect("block_id pattern is valid"))
}

/// Extract the `block_id=<value>;` tag from a read name.
pub fn extract_block_id(name: &str) -> Option<Arc<str>> {
    block_id_pattern()
        .captures(name)
        .and_then(|captures| captures.get(1))
        .map(|value| Arc::from(value.as_str()))
}

/// Walk a single read against the reference and report its changes.
///
/// The read-length filter applies here; the quality filter is left to
/// [`changes_from_alignment`].
pub fn changes_from_read(
    reference: &[u8],
    read_id: usize,
    read: &AlignedRead,
    config: &ParserConfig,
) -> Result<Vec<ChangeRecord>, ParserError> {
    if !config.accepts_length(read.len(), reference.len()) {
        debug!(
            read_id,
            read_len = read.len(),
            reference_len = reference.len(),
            "skipping read outside length threshold"
        );
        return Ok(Vec::new());
    }

    let block_id = extract_block_id(&read.name);
    let mut changes = Vec::new();
    let mut push = |change: Change, quality: f32| {
        changes.push(ChangeRecord {
            read_id,
            block_id: block_id.clone(),
            change,
            quality,
        })
    };

    let mut read_pos = 0usize;
    let mut ref_pos = read.pos as usize;

    for op in &read.cigar {
        let len = op.len as usize;
        match op.kind()? {
            CigarOpKind::SequenceMatch => {
                read_pos += len;
                ref_pos += len;
            }
            CigarOpKind::Match if !config.compare_matches => {
                read_pos += len;
                ref_pos += len;
            }
            CigarOpKind::Match | CigarOpKind::Mismatch => {
                for offset in 0..len {
                    let position = ref_pos + offset;
                    let ref_base = reference.get(position).copied().ok_or(
                        ParserError::ReferenceOverrun {
                            position,
                            len: reference.len(),
                        },
                    )?;
                    let read_base = read_base(read, read_pos + offset)?;

                    match (Nucleotide::from_ascii(ref_base), Nucleotide::from_ascii(read_base)) {
                        (Some(from), Some(to)) if from != to => push(
                            Change::new(position, Mutation::substitution(from, to)),
                            read
                                .quality_at(read_pos + offset)
                                .map_or(config.default_quality, f32::from),
                        ),
                        (Some(_), Some(_)) => {}
                        _ if ref_base.eq_ignore_ascii_case(&read_base) => {}
                        _ => trace!(
                            read_id,
                            position,
                            "ignoring mismatch with ambiguous base"
                        ),
                    }
                }
                read_pos += len;
                ref_pos += len;
            }
            CigarOpKind::Deletion => {
                if len > 0 {
                    push(
                        Change::new(ref_pos, Mutation::Deletion(op.len)),
                        DELETION_QUALITY,
                    );
                }
                ref_pos += len;
            }
            CigarOpKind::Insertion => {
                if len > 0 {
                    let end = read_pos + len;
                    // validates the whole span before slicing
                    read_base(read, end - 1)?;
                    let bases =
                        String::from_utf8_lossy(&read.sequence[read_pos..end]).into_owned();
                    push(
                        Change::new(ref_pos, Mutation::Insertion(bases)),
                        mean_quality(read, read_pos..end).unwrap_or(config.default_quality),
                    );
                }
                read_pos += len;
            }
            CigarOpKind::SoftClip => {
                read_pos += len;
            }
        }
    }

    Ok(changes)
}

fn read_base(read: &AlignedRead, offset: usize) -> Result<u8, ParserError> {
    read.base_at(offset).ok_or(ParserError::ReadOverrun {
        offset,
        len: read.len(),
    })
}

fn mean_quality(read: &AlignedRead, span: std::ops::Range<usize>) -> Option<f32> {
    let qualities = read.qualities.as_ref()?.get(span)?;
    if qualities.is_empty() {
        return None;
    }
    let sum: u32 = qualities.iter().map(|&q| u32::from(q)).sum();
    Some(sum as f32 / qualities.len() as f32)
}

/// Collect the changes of every read in an alignment stream.
///
/// Reads are numbered in stream order. Any failure aborts the whole scan and
/// names the offending read.
pub fn changes_from_alignment<I>(
    reference: &[u8],
    reads: I,
    config: &ParserConfig,
) -> Result<ChangeTable, ParserError>
where
    I: IntoIterator,
    I::Item: Borrow<AlignedRead>,
{
    let mut table = ChangeTable::default();
    let mut dropped = 0usize;

    for (read_id, read) in reads.into_iter().enumerate() {
        let read = read.borrow();
        let changes =
            changes_from_read(reference, read_id, read, config).map_err(|source| {
                ParserError::InRead {
                    read_id,
                    name: read.name.to_string(),
                    source: Box::new(source),
                }
            })?;

        table.n_seq += 1;
        *table
            .block_reads
            .entry(extract_block_id(&read.name))
            .or_insert(0) += 1;

        for record in changes {
            if config.retains(record.quality) {
                table.records.push(record);
            } else {
                dropped += 1;
            }
        }
    }

    info!(
        reads = table.n_seq,
        changes = table.len(),
        below_quality = dropped,
        "scanned alignment"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::CigarOp;

    fn read(pos: u32, cigar: Vec<CigarOp>, sequence: &[u8], qualities: Option<Vec<u8>>) -> AlignedRead {
        AlignedRead::new("read", pos, cigar, sequence.to_vec(), qualities)
    }

    #[test]
    fn mismatch_emits_substitution_with_quality() {
        let read = read(
            0,
            vec![CigarOp::new(CigarOpKind::Mismatch, 1)],
            b"G",
            Some(vec![40]),
        );
        let changes = changes_from_read(b"AAAA", 0, &read, &ParserConfig::default()).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].position(), 0);
        assert_eq!(changes[0].mutation(), "A->G");
        assert_eq!(changes[0].quality, 40.0);
    }

    #[test]
    fn missing_qualities_use_default() {
        let read = read(1, vec![CigarOp::new(CigarOpKind::Mismatch, 2)], b"AC", None);
        let changes = changes_from_read(b"AAAA", 0, &read, &ParserConfig::default()).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].position(), 2);
        assert_eq!(changes[0].quality, DEFAULT_QUALITY);
    }

    #[test]
    fn insertion_quality_is_mean() {
        let read = read(
            0,
            vec![
                CigarOp::new(CigarOpKind::SequenceMatch, 2),
                CigarOp::new(CigarOpKind::Insertion, 2),
                CigarOp::new(CigarOpKind::SequenceMatch, 2),
            ],
            b"AATTAA",
            Some(vec![30, 30, 20, 40, 30, 30]),
        );
        let changes = changes_from_read(b"AAAA", 0, &read, &ParserConfig::default()).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].position(), 2);
        assert_eq!(changes[0].mutation(), "iTT");
        assert_eq!(changes[0].quality, 30.0);
    }

    #[test]
    fn insertion_bases_are_kept_verbatim() {
        let read = read(
            0,
            vec![
                CigarOp::new(CigarOpKind::SequenceMatch, 1),
                CigarOp::new(CigarOpKind::Insertion, 3),
            ],
            b"AtNg",
            None,
        );
        let changes = changes_from_read(b"AAAA", 0, &read, &ParserConfig::default()).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].mutation(), "itNg");
    }

    #[test]
    fn plain_match_is_only_compared_on_request() {
        let read = read(0, vec![CigarOp::new(CigarOpKind::Match, 4)], b"AGAA", None);
        let silent = changes_from_read(b"AAAA", 0, &read, &ParserConfig::default()).unwrap();
        assert!(silent.is_empty());

        let config = ParserConfig::default().with_match_comparison(true);
        let compared = changes_from_read(b"AAAA", 0, &read, &config).unwrap();
        assert_eq!(compared.len(), 1);
        assert_eq!(compared[0].mutation(), "A->G");
    }

    #[test]
    fn ambiguous_read_bases_are_ignored() {
        let read = read(0, vec![CigarOp::new(CigarOpKind::Mismatch, 2)], b"NG", None);
        let changes = changes_from_read(b"AA", 0, &read, &ParserConfig::default()).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].position(), 1);
    }

    #[test]
    fn overruns_are_reported() {
        let short_read = read(0, vec![CigarOp::new(CigarOpKind::Mismatch, 3)], b"GG", None);
        assert!(matches!(
            changes_from_read(b"AAAA", 0, &short_read, &ParserConfig::default()),
            Err(ParserError::ReadOverrun { offset: 2, len: 2 })
        ));

        let past_end = read(3, vec![CigarOp::new(CigarOpKind::Mismatch, 2)], b"GG", None);
        assert!(matches!(
            changes_from_read(b"AAAA", 0, &past_end, &ParserConfig::default()),
            Err(ParserError::ReferenceOverrun { position: 4, len: 4 })
        ));
    }

    #[test]
    fn block_id_is_taken_from_read_name() {
        assert_eq!(
            extract_block_id("sim_3;block_id=17;sample=a").as_deref(),
            Some("17")
        );
        assert_eq!(extract_block_id("block_id=17"), None);
        assert_eq!(extract_block_id("read_1"), None);
    }

    #[test]
    fn thresholds_map_non_positive_to_disabled() {
        let config = ParserConfig::default()
            .with_quality_threshold(0.0)
            .with_length_threshold(-1);
        assert_eq!(config.quality_threshold, None);
        assert_eq!(config.length_threshold, None);

        let config = ParserConfig::default()
            .with_quality_threshold(47.0)
            .with_length_threshold(100);
        assert_eq!(config.quality_threshold, Some(47.0));
        assert_eq!(config.length_threshold, Some(100));
    }
}
