use std::io::Write;

use serde::Serialize;

use super::TableError;
use crate::genomics::{ChangeTable, HaplotypeCount, MutationFrequency};

#[derive(Serialize)]
struct ChangeRow<'a> {
    seq_id: usize,
    block_id: Option<&'a str>,
    position: usize,
    mutation: String,
    quality: f32,
}

#[derive(Serialize)]
struct CountRow<'a> {
    haplotype: &'a str,
    count: u64,
}

#[derive(Serialize)]
struct BlockCountRow<'a> {
    haplotype: &'a str,
    count: u64,
    block_id: Option<&'a str>,
}

#[derive(Serialize)]
struct FrequencyRow {
    position: usize,
    mutation: String,
    count: u64,
    frequency: f64,
}

const CHANGE_HEADER: [&str; 5] = ["seq_id", "block_id", "position", "mutation", "quality"];
const COUNT_HEADER: [&str; 2] = ["haplotype", "count"];
const BLOCK_COUNT_HEADER: [&str; 3] = ["haplotype", "count", "block_id"];
const FREQUENCY_HEADER: [&str; 4] = ["position", "mutation", "count", "frequency"];

/// CSV writer whose header is written up front, so empty tables keep it.
fn csv_writer<W: Write>(writer: W, header: &[&str]) -> Result<csv::Writer<W>, TableError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(header)?;
    Ok(writer)
}

/// Write one CSV row per detected change.
pub fn write_changes<W: Write>(writer: W, table: &ChangeTable) -> Result<(), TableError> {
    let mut writer = csv_writer(writer, &CHANGE_HEADER)?;
    for record in &table.records {
        writer.serialize(ChangeRow {
            seq_id: record.read_id,
            block_id: record.block_id.as_deref(),
            position: record.position(),
            mutation: record.mutation(),
            quality: record.quality,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the haplotype count table. The `block_id` column is only emitted
/// when at least one row carries a block.
pub fn write_haplotype_counts<W: Write>(
    writer: W,
    counts: &[HaplotypeCount],
) -> Result<(), TableError> {
    let with_blocks = counts.iter().any(|count| count.block_id.is_some());
    let header: &[&str] = if with_blocks {
        &BLOCK_COUNT_HEADER
    } else {
        &COUNT_HEADER
    };
    let mut writer = csv_writer(writer, header)?;

    for count in counts {
        if with_blocks {
            writer.serialize(BlockCountRow {
                haplotype: &count.haplotype,
                count: count.count,
                block_id: count.block_id.as_deref(),
            })?;
        } else {
            writer.serialize(CountRow {
                haplotype: &count.haplotype,
                count: count.count,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write the per-change frequency table.
pub fn write_mutation_frequencies<W: Write>(
    writer: W,
    frequencies: &[MutationFrequency],
) -> Result<(), TableError> {
    let mut writer = csv_writer(writer, &FREQUENCY_HEADER)?;
    for frequency in frequencies {
        writer.serialize(FrequencyRow {
            position: frequency.change.position,
            mutation: frequency.change.mutation.to_string(),
            count: frequency.count,
            frequency: frequency.frequency,
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::genomics::ChangeRecord;
    use crate::haplotype::parse_change;

    fn render(write: impl FnOnce(&mut Vec<u8>) -> Result<(), TableError>) -> String {
        let mut buffer = Vec::new();
        write(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn counts_without_blocks_have_two_columns() {
        let counts = vec![HaplotypeCount {
            haplotype: "consensus".into(),
            count: 4,
            block_id: None,
        }];
        let csv = render(|out| write_haplotype_counts(out, &counts));
        assert_eq!(csv, "haplotype,count\nconsensus,4\n");
    }

    #[test]
    fn counts_with_blocks_add_a_column() {
        let counts = vec![
            HaplotypeCount {
                haplotype: "1:A->G".into(),
                count: 2,
                block_id: Some(Arc::from("3")),
            },
            HaplotypeCount {
                haplotype: "consensus".into(),
                count: 1,
                block_id: None,
            },
        ];
        let csv = render(|out| write_haplotype_counts(out, &counts));
        assert_eq!(csv, "haplotype,count,block_id\n1:A->G,2,3\nconsensus,1,\n");
    }

    #[test]
    fn empty_tables_still_have_a_header() {
        let csv = render(|out| write_haplotype_counts(out, &[]));
        assert_eq!(csv, "haplotype,count\n");

        let csv = render(|out| write_changes(out, &ChangeTable::default()));
        assert_eq!(csv, "seq_id,block_id,position,mutation,quality\n");

        let csv = render(|out| write_mutation_frequencies(out, &[]));
        assert_eq!(csv, "position,mutation,count,frequency\n");
    }

    #[test]
    fn changes_are_written_one_per_row() {
        let table = ChangeTable {
            records: vec![ChangeRecord {
                read_id: 3,
                block_id: Some(Arc::from("b")),
                change: parse_change("7:del2").unwrap(),
                quality: 0.0,
            }],
            n_seq: 4,
            ..ChangeTable::default()
        };
        let csv = render(|out| write_changes(out, &table));
        assert_eq!(
            csv,
            "seq_id,block_id,position,mutation,quality\n3,b,7,del2,0.0\n"
        );
    }
}
