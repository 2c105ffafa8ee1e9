use std::path::{Path, PathBuf};

use rust_htslib::bam::{self, Read as _, Record};
use thiserror::Error;
use tracing::info;

use crate::genomics::{AlignedRead, CigarOp};

/// Quality byte BAM uses when a read carries no qualities.
const MISSING_QUALITY: u8 = 0xff;

/// Errors raised while reading references and alignments.
#[derive(Debug, Error)]
pub enum IoError {
    /// Reference file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying failure.
        source: std::io::Error,
    },

    /// Reference file holds a header but no bases.
    #[error("reference {0} contains no sequence")]
    EmptyReference(PathBuf),

    /// Failure reported by htslib.
    #[error("BAM error: {0}")]
    Bam(#[from] rust_htslib::errors::Error),
}

/// Reference sequence from file contents: the first line is a header and is
/// dropped, the remaining lines are concatenated.
pub fn parse_reference(contents: &str) -> String {
    contents.lines().skip(1).map(str::trim_end).collect()
}

/// Read a single-record reference file.
pub fn read_reference<P: AsRef<Path>>(path: P) -> Result<String, IoError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let reference = parse_reference(&contents);
    if reference.is_empty() {
        return Err(IoError::EmptyReference(path.to_path_buf()));
    }
    info!(path = %path.display(), length = reference.len(), "read reference");
    Ok(reference)
}

/// Convert an htslib record into an [`AlignedRead`], keeping raw CIGAR codes.
pub fn aligned_read_from_record(record: &Record) -> AlignedRead {
    let name = String::from_utf8_lossy(record.qname()).into_owned();
    let cigar = record
        .raw_cigar()
        .iter()
        .map(|&word| CigarOp::from_raw(word & 0xf, word >> 4))
        .collect();
    let qual = record.qual();
    let qualities = if qual.is_empty() || qual.iter().all(|&q| q == MISSING_QUALITY) {
        None
    } else {
        Some(qual.to_vec())
    };
    // unmapped reads report -1 and carry no CIGAR
    let pos = u32::try_from(record.pos()).unwrap_or(0);

    AlignedRead::new(name, pos, cigar, record.seq().as_bytes(), qualities)
}

/// Read every record of a BAM/SAM file in file order.
pub fn read_alignment<P: AsRef<Path>>(path: P) -> Result<Vec<AlignedRead>, IoError> {
    let path = path.as_ref();
    let mut reader = bam::Reader::from_path(path)?;
    let mut record = Record::new();
    let mut reads = Vec::new();

    while let Some(result) = reader.read(&mut record) {
        result?;
        reads.push(aligned_read_from_record(&record));
    }

    info!(path = %path.display(), reads = reads.len(), "read alignment");
    Ok(reads)
}
