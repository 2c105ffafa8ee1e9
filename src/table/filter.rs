use std::collections::{BTreeMap, HashMap};

use tracing::{info, warn};

use super::{column, HaplotypeRecord, HaplotypeTable, TableError};
use crate::haplotype::{closest_ancestor, haplotype_to_set, haplotype_to_string, Haplotype};

/// Scale applied to the earliest sampling time of merged replicates.
const MERGED_TIME_SCALE: f64 = 100.0;

fn required<T: Copy>(value: Option<T>, column: &'static str, row: usize) -> Result<T, TableError> {
    value.ok_or(TableError::MissingValue { column, row })
}

impl HaplotypeTable {
    fn retain_rows(
        mut self,
        mut keep: impl FnMut(usize, &HaplotypeRecord) -> Result<bool, TableError>,
    ) -> Result<Self, TableError> {
        let before = self.records.len();
        let mut records = Vec::with_capacity(before);
        for (row, record) in self.records.into_iter().enumerate() {
            if keep(row, &record)? {
                records.push(record);
            }
        }
        self.records = records;
        info!(before, after = self.records.len(), "filtered haplotype table");
        Ok(self)
    }

    /// Keep rows whose count is at least `min_count`.
    pub fn filter_min_count(self, min_count: u64) -> Result<Self, TableError> {
        self.require_columns(&[column::COUNT])?;
        self.retain_rows(|row, record| {
            Ok(required(record.count, column::COUNT, row)? >= min_count)
        })
    }

    /// Keep rows whose share of their sample's total count is at least
    /// `min_frequency`.
    ///
    /// Rows are grouped by `sample_name`; rows without one (or a table without
    /// the column) share a single group.
    pub fn filter_min_frequency(self, min_frequency: f64) -> Result<Self, TableError> {
        self.require_columns(&[column::COUNT])?;
        let mut totals: HashMap<Option<String>, u64> = HashMap::new();
        for (row, record) in self.records.iter().enumerate() {
            *totals.entry(record.sample_name.clone()).or_insert(0) +=
                required(record.count, column::COUNT, row)?;
        }
        self.retain_rows(|row, record| {
            let count = required(record.count, column::COUNT, row)?;
            let total = totals.get(&record.sample_name).copied().unwrap_or(0);
            Ok(total == 0 || count as f64 / total as f64 >= min_frequency)
        })
    }

    /// Drop haplotypes carrying at least one insertion.
    pub fn filter_insertions(self) -> Result<Self, TableError> {
        self.retain_rows(|_, record| {
            Ok(!Haplotype::from(record.haplotype.as_str()).has_insertion()?)
        })
    }

    /// Drop ancestral rows (sampling time `0`); rows without a time are kept.
    pub fn exclude_ancestors(self) -> Result<Self, TableError> {
        self.require_columns(&[column::TIME])?;
        self.retain_rows(|_, record| Ok(record.time != Some(0.0)))
    }

    /// Number each row's lineage as `replicate + max_replicate * compartment`
    /// and derive its id as `<haplotype>_<lineage>`.
    pub fn assign_lineage_ids(mut self) -> Result<Self, TableError> {
        self.require_columns(&[column::REPLICATE, column::COMPARTMENT])?;

        let mut max_replicate = 0i64;
        for (row, record) in self.records.iter().enumerate() {
            max_replicate = max_replicate.max(required(record.replicate, column::REPLICATE, row)?);
        }

        for (row, record) in self.records.iter_mut().enumerate() {
            let replicate = required(record.replicate, column::REPLICATE, row)?;
            let compartment = required(record.compartment, column::COMPARTMENT, row)?;
            let lineage = replicate + max_replicate * compartment;
            record.lineage = Some(lineage);
            record.id = Some(format!("{}_{}", record.haplotype, lineage));
        }

        self.add_column(column::LINEAGE);
        self.add_column(column::ID);
        Ok(self)
    }

    /// Recompute lineage ids when the table has `replicate` and `compartment`,
    /// replacing any existing ids; other tables are returned unchanged.
    pub fn refresh_lineage_ids(self) -> Result<Self, TableError> {
        if self.has_column(column::REPLICATE) && self.has_column(column::COMPARTMENT) {
            self.assign_lineage_ids()
        } else {
            Ok(self)
        }
    }

    /// Collapse rows sharing a haplotype into one row per haplotype.
    ///
    /// Counts are summed, the id becomes the haplotype itself and the time is
    /// the earliest sampling time scaled by 100. Rows come out ordered by
    /// haplotype string.
    pub fn merge_replicates(self) -> Result<Self, TableError> {
        self.require_columns(&[column::COUNT, column::TIME])?;

        let mut merged: BTreeMap<String, (u64, f64)> = BTreeMap::new();
        for (row, record) in self.records.iter().enumerate() {
            let count = required(record.count, column::COUNT, row)?;
            let time = required(record.time, column::TIME, row)?;
            let entry = merged
                .entry(record.haplotype.clone())
                .or_insert((0, f64::INFINITY));
            entry.0 += count;
            entry.1 = entry.1.min(time);
        }
        info!(rows = self.records.len(), haplotypes = merged.len(), "merged replicates");

        let records = merged
            .into_iter()
            .map(|(haplotype, (count, time))| HaplotypeRecord {
                id: Some(haplotype.clone()),
                time: Some(MERGED_TIME_SCALE * time),
                ..HaplotypeRecord::new(haplotype, count)
            })
            .collect();
        Ok(Self::new(
            [column::ID, column::HAPLOTYPE, column::COUNT, column::TIME],
            records,
        ))
    }

    /// Annotate every descendant row (time > 0) with the closest ancestral
    /// (time 0) haplotype by symmetric-difference distance.
    pub fn annotate_closest_ancestors(mut self) -> Result<Self, TableError> {
        self.require_columns(&[column::TIME])?;

        let mut ancestors = Vec::new();
        for record in self.records.iter().filter(|record| record.time == Some(0.0)) {
            ancestors.push(haplotype_to_set(record.haplotype.as_str())?);
        }
        if ancestors.is_empty() {
            warn!("no ancestral rows (time 0) found");
        }

        for record in &mut self.records {
            if !record.time.is_some_and(|time| time > 0.0) {
                continue;
            }
            let descendant = haplotype_to_set(record.haplotype.as_str())?;
            record.closest_ancestor = closest_ancestor(&descendant, &ancestors)
                .map(|index| haplotype_to_string(ancestors[index].clone()));
        }

        self.add_column(column::CLOSEST_ANCESTOR);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> HaplotypeTable {
        HaplotypeTable::read_csv(
            "haplotype,count,time,compartment,replicate\n\
             consensus,6,0,0,1\n\
             1:A->G,3,0,1,2\n\
             1:A->G;4:iTT,1,2,1,1\n\
             1:A->G;7:C->T,2,3,0,2\n"
                .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn count_and_frequency_filters() {
        let by_count = table().filter_min_count(2).unwrap();
        assert_eq!(by_count.len(), 3);

        let by_frequency = table().filter_min_frequency(0.25).unwrap();
        let kept: Vec<&str> = by_frequency.haplotypes().collect();
        assert_eq!(kept, vec!["consensus", "1:A->G"]);
    }

    #[test]
    fn frequency_is_relative_to_the_sample() {
        let table = HaplotypeTable::read_csv(
            "sample_name,haplotype,count\n\
             a,consensus,90\n\
             a,1:A->G,10\n\
             b,consensus,1\n\
             b,2:C->T,1\n"
                .as_bytes(),
        )
        .unwrap();
        // 1:A->G is 10% of sample a; 2:C->T is half of sample b
        let filtered = table.filter_min_frequency(0.2).unwrap();
        let kept: Vec<&str> = filtered.haplotypes().collect();
        assert_eq!(kept, vec!["consensus", "consensus", "2:C->T"]);
    }

    #[test]
    fn insertion_filter_parses_changes() {
        let filtered = table().filter_insertions().unwrap();
        assert_eq!(filtered.len(), 3);
        assert!(filtered.haplotypes().all(|h| !h.contains("iTT")));
    }

    #[test]
    fn ancestors_are_excluded_by_time() {
        let filtered = table().exclude_ancestors().unwrap();
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn lineage_ids_combine_replicate_and_compartment() {
        let table = table().assign_lineage_ids().unwrap();
        let lineages: Vec<i64> = table.records.iter().filter_map(|r| r.lineage).collect();
        assert_eq!(lineages, vec![1, 4, 3, 2]);
        assert_eq!(table.records[1].id.as_deref(), Some("1:A->G_4"));
        assert!(table.has_column(column::ID));
    }

    #[test]
    fn existing_ids_are_replaced_by_lineage_ids() {
        let table = HaplotypeTable::read_csv(
            "haplotype,id,compartment,replicate\n1:A->G,old,1,2\n".as_bytes(),
        )
        .unwrap()
        .refresh_lineage_ids()
        .unwrap();
        assert_eq!(table.records[0].id.as_deref(), Some("1:A->G_4"));
        assert_eq!(table.records[0].lineage, Some(4));

        let plain = HaplotypeTable::read_csv("haplotype,id\n1:A->G,kept\n".as_bytes()).unwrap();
        assert_eq!(plain.clone().refresh_lineage_ids().unwrap(), plain);
    }

    #[test]
    fn replicates_merge_by_haplotype() {
        let mut table = table();
        table.records.push(HaplotypeRecord {
            time: Some(1.0),
            ..HaplotypeRecord::new("1:A->G", 4)
        });
        let merged = table.merge_replicates().unwrap();
        assert_eq!(merged.len(), 4);
        let row = &merged.records[0];
        assert_eq!(row.haplotype, "1:A->G");
        assert_eq!(row.count, Some(7));
        assert_eq!(row.time, Some(0.0));
        assert_eq!(merged.columns, vec!["id", "haplotype", "count", "time"]);
    }

    #[test]
    fn descendants_get_closest_ancestor() {
        let table = table().annotate_closest_ancestors().unwrap();
        assert_eq!(table.records[0].closest_ancestor, None);
        assert_eq!(table.records[2].closest_ancestor.as_deref(), Some("1:A->G"));
        assert_eq!(table.records[3].closest_ancestor.as_deref(), Some("1:A->G"));
    }

    #[test]
    fn missing_columns_are_reported() {
        let table = HaplotypeTable::new([column::HAPLOTYPE], vec![]);
        assert!(matches!(
            table.exclude_ancestors(),
            Err(TableError::MissingColumn(name)) if name == "time"
        ));
    }
}
