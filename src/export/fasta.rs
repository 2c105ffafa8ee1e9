use super::{aligned_rows, fill_template, ExportError};
use crate::table::HaplotypeTable;

/// Built-in FASTA template.
pub const FASTA_TEMPLATE: &str = "{data}\n";

/// Render a haplotype table as FASTA, one record per counted read.
pub fn render_fasta(
    table: &HaplotypeTable,
    reference: &str,
    template: Option<&str>,
) -> Result<String, ExportError> {
    let (ids, sequences) = aligned_rows(table, reference, true)?;
    let data = ids
        .iter()
        .zip(&sequences)
        .map(|(id, sequence)| format!(">{id}\n{sequence}"))
        .collect::<Vec<_>>()
        .join("\n");

    let n_tax = sequences.len().to_string();
    let n_char = sequences.first().map_or(0, String::len).to_string();
    Ok(fill_template(
        template.unwrap_or(FASTA_TEMPLATE),
        &[
            ("n_tax", n_tax.as_str()),
            ("n_char", n_char.as_str()),
            ("data", data.as_str()),
        ],
    ))
}
