use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::info;

use crate::genomics::ChangeTable;
use crate::haplotype::{join_changes, Change, CONSENSUS};

/// Number of reads sharing one haplotype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaplotypeCount {
    /// Haplotype in string form.
    pub haplotype: String,
    /// Number of reads carrying the haplotype.
    pub count: u64,
    /// Block the reads belong to, when read names carry one.
    pub block_id: Option<Arc<str>>,
}

/// Frequency of a single change across all scanned reads.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationFrequency {
    /// The change.
    pub change: Change,
    /// Number of change rows observed.
    pub count: u64,
    /// `count / n_seq`.
    pub frequency: f64,
}

/// Group the change table into haplotypes and count identical ones.
///
/// Reads without retained changes are counted under `consensus`, per block
/// when `block_reads` names one and otherwise against `n_seq`. The result is
/// sorted by descending count.
pub fn count_haplotypes(table: &ChangeTable) -> Vec<HaplotypeCount> {
    let mut per_read: BTreeMap<usize, (Option<Arc<str>>, Vec<Change>)> = BTreeMap::new();
    for record in &table.records {
        per_read
            .entry(record.read_id)
            .or_insert_with(|| (record.block_id.clone(), Vec::new()))
            .1
            .push(record.change.clone());
    }

    let mut counts: HashMap<(Option<Arc<str>>, String), u64> = HashMap::new();
    let mut reads_with_changes: HashMap<Option<Arc<str>>, usize> = HashMap::new();
    for (block_id, mut changes) in per_read.into_values() {
        changes.sort_by_key(|change| change.position);
        *reads_with_changes.entry(block_id.clone()).or_insert(0) += 1;
        *counts.entry((block_id, join_changes(&changes))).or_insert(0) += 1;
    }

    // reads not attributed to a named block fall back to the unnamed one
    let mut block_reads = table.block_reads.clone();
    let attributed: usize = block_reads.values().sum();
    if table.n_seq > attributed {
        *block_reads.entry(None).or_insert(0) += table.n_seq - attributed;
    }

    for (block_id, &total) in &block_reads {
        let with_changes = reads_with_changes.get(block_id).copied().unwrap_or(0);
        let unchanged = total.saturating_sub(with_changes) as u64;
        if unchanged > 0 {
            *counts
                .entry((block_id.clone(), CONSENSUS.to_string()))
                .or_insert(0) += unchanged;
        }
    }

    let mut haplotypes: Vec<HaplotypeCount> = counts
        .into_iter()
        .map(|((block_id, haplotype), count)| HaplotypeCount {
            haplotype,
            count,
            block_id,
        })
        .collect();
    haplotypes.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.block_id.cmp(&b.block_id))
            .then_with(|| a.haplotype.cmp(&b.haplotype))
    });

    info!(haplotypes = haplotypes.len(), "counted haplotypes");
    haplotypes
}

/// Count each distinct change and normalise by the number of scanned reads.
/// Sorted by descending frequency.
pub fn mutation_frequencies(table: &ChangeTable) -> Vec<MutationFrequency> {
    let mut counts: BTreeMap<&Change, u64> = BTreeMap::new();
    for record in &table.records {
        *counts.entry(&record.change).or_insert(0) += 1;
    }

    let n_seq = table.n_seq;
    let mut frequencies: Vec<MutationFrequency> = counts
        .into_iter()
        .map(|(change, count)| MutationFrequency {
            change: change.clone(),
            count,
            frequency: if n_seq == 0 {
                0.0
            } else {
                count as f64 / n_seq as f64
            },
        })
        .collect();
    frequencies.sort_by(|a, b| b.count.cmp(&a.count));

    info!(mutations = frequencies.len(), "computed mutation frequencies");
    frequencies
}
