use std::collections::BTreeMap;

use thiserror::Error;
use tracing::info;

use crate::genomics::ChangeTable;
use crate::haplotype::{Change, Mutation};

/// Expected sequencing errors per genome used to derive the default quality
/// threshold.
pub const DEFAULT_ERRORS_PER_GENOME: f64 = 0.1;
/// Fraction of reads a change must exceed to enter the consensus.
pub const DEFAULT_MAJORITY: f64 = 0.5;

/// Errors raised while building a consensus sequence.
#[derive(Debug, Error)]
pub enum ConsensusError {
    /// A majority change is not a substitution.
    #[error("majority change {0} is not a substitution")]
    UnsupportedChange(Change),

    /// A majority change lies beyond the reference.
    #[error("majority change {0} lies outside the reference")]
    OutOfRange(Change),
}

/// Settings for majority consensus calling.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusConfig {
    /// Fixed quality threshold; derived from the reference length when unset.
    pub quality_threshold: Option<f32>,
    /// Expected errors per genome for the derived threshold.
    pub errors_per_genome: f64,
    /// Minimum (exclusive) fraction of reads supporting a change.
    pub majority: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            quality_threshold: None,
            errors_per_genome: DEFAULT_ERRORS_PER_GENOME,
            majority: DEFAULT_MAJORITY,
        }
    }
}

impl ConsensusConfig {
    /// Use a fixed quality threshold.
    pub fn with_quality_threshold(mut self, threshold: f32) -> Self {
        self.quality_threshold = Some(threshold);
        self
    }

    /// Override the majority fraction.
    pub fn with_majority(mut self, majority: f64) -> Self {
        self.majority = majority;
        self
    }

    /// Phred threshold allowing `errors_per_genome` errors over the reference.
    pub fn threshold_for(&self, reference_len: usize) -> f32 {
        self.quality_threshold.unwrap_or_else(|| {
            let per_base = self.errors_per_genome / reference_len.max(1) as f64;
            (-10.0 * per_base.log10()) as f32
        })
    }
}

/// Consensus sequence together with the changes that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Consensus {
    /// Reference with majority substitutions applied.
    pub sequence: String,
    /// Majority changes in position order.
    pub applied: Vec<Change>,
}

/// Apply every change carried by a majority of reads to the reference.
pub fn consensus_sequence(
    reference: &str,
    table: &ChangeTable,
    config: &ConsensusConfig,
) -> Result<Consensus, ConsensusError> {
    let threshold = config.threshold_for(reference.len());
    let filtered = table.retain_quality_above(threshold);
    info!(
        changes = table.len(),
        retained = filtered.len(),
        threshold,
        "filtered changes for consensus"
    );

    let mut support: BTreeMap<&Change, usize> = BTreeMap::new();
    for record in &filtered.records {
        *support.entry(&record.change).or_insert(0) += 1;
    }

    let n_seq = table.n_seq.max(1) as f64;
    let mut bases: Vec<char> = reference.chars().collect();
    let mut applied = Vec::new();
    for (change, count) in support {
        if count as f64 / n_seq <= config.majority {
            continue;
        }
        let Mutation::Substitution { to, .. } = change.mutation else {
            return Err(ConsensusError::UnsupportedChange(change.clone()));
        };
        let base = bases
            .get_mut(change.position)
            .ok_or_else(|| ConsensusError::OutOfRange(change.clone()))?;
        *base = to.as_char();
        applied.push(change.clone());
    }

    info!(majority_changes = applied.len(), "built consensus sequence");
    Ok(Consensus {
        sequence: bases.into_iter().collect(),
        applied,
    })
}
