use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use super::{column, HaplotypeTable, TableError};

/// Seed used by the CLI when none is given.
pub const DEFAULT_RANDOM_STATE: u64 = 42;

impl HaplotypeTable {
    fn counts(&self) -> Result<Vec<u64>, TableError> {
        self.require_columns(&[column::COUNT])?;
        self.records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                record.count.ok_or(TableError::MissingValue {
                    column: column::COUNT,
                    row,
                })
            })
            .collect()
    }

    fn keep_indices(mut self, mut indices: Vec<usize>) -> Self {
        indices.sort_unstable();
        let mut records: Vec<_> = std::mem::take(&mut self.records)
            .into_iter()
            .map(Some)
            .collect();
        self.records = indices
            .into_iter()
            .filter_map(|index| records[index].take())
            .collect();
        self
    }

    /// Draw `n_samples` distinct rows, weighted by their count, with a
    /// generator seeded from `random_state`. Kept rows stay in table order.
    ///
    /// `n_samples == 0` leaves the table untouched.
    pub fn sample_weighted(self, n_samples: usize, random_state: u64) -> Result<Self, TableError> {
        if n_samples == 0 {
            return Ok(self);
        }
        let counts = self.counts()?;
        if n_samples > counts.len() {
            return Err(TableError::SampleTooLarge {
                requested: n_samples,
                rows: counts.len(),
            });
        }

        let mut rng = StdRng::seed_from_u64(random_state);
        let rows: Vec<usize> = (0..counts.len()).collect();
        let chosen: Vec<usize> = rows
            .choose_multiple_weighted(&mut rng, n_samples, |&row| counts[row] as f64)?
            .copied()
            .collect();

        info!(rows = counts.len(), n_samples, random_state, "sampled haplotype rows");
        Ok(self.keep_indices(chosen))
    }

    /// Keep the `n_samples` rows with the largest counts, in table order.
    ///
    /// Ties go to the earlier row; `n_samples == 0` keeps every row.
    pub fn take_largest(self, n_samples: usize) -> Result<Self, TableError> {
        if n_samples == 0 {
            return Ok(self);
        }
        let counts = self.counts()?;
        let mut rows: Vec<usize> = (0..counts.len()).collect();
        rows.sort_by(|&a, &b| counts[b].cmp(&counts[a]));
        rows.truncate(n_samples);

        info!(rows = counts.len(), kept = rows.len(), "took largest haplotypes");
        Ok(self.keep_indices(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> HaplotypeTable {
        HaplotypeTable::read_csv(
            "haplotype,count\n\
             consensus,50\n\
             1:A->G,5\n\
             2:C->T,20\n\
             3:G->A,5\n\
             4:T->C,0\n"
                .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn largest_rows_keep_table_order() {
        let taken = table().take_largest(3).unwrap();
        let kept: Vec<&str> = taken.haplotypes().collect();
        assert_eq!(kept, vec!["consensus", "1:A->G", "2:C->T"]);
    }

    #[test]
    fn take_zero_keeps_everything() {
        assert_eq!(table().take_largest(0).unwrap(), table());
        assert_eq!(table().take_largest(10).unwrap().len(), 5);
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let first = table().sample_weighted(3, 7).unwrap();
        let second = table().sample_weighted(3, 7).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);

        // distinct rows, still in table order
        let source = table();
        let positions: Vec<usize> = first
            .haplotypes()
            .map(|h| source.haplotypes().position(|row| row == h).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn sampling_every_row_keeps_the_table() {
        let table = HaplotypeTable::read_csv("haplotype,count\na,1\nb,2\n".as_bytes()).unwrap();
        assert_eq!(table.clone().sample_weighted(2, 1).unwrap(), table);
    }

    #[test]
    fn oversized_samples_are_rejected() {
        assert!(matches!(
            table().sample_weighted(6, DEFAULT_RANDOM_STATE),
            Err(TableError::SampleTooLarge { requested: 6, rows: 5 })
        ));
    }

    #[test]
    fn sampling_needs_counts() {
        let table = HaplotypeTable::read_csv("haplotype\na\n".as_bytes()).unwrap();
        assert!(matches!(
            table.sample_weighted(1, 1),
            Err(TableError::MissingColumn(name)) if name == "count"
        ));
    }
}
