use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use phynalysis::export::{self, ExportFormat};
use phynalysis::genomics::{
    changes_from_alignment, consensus_sequence, count_haplotypes, mutation_frequencies,
    read_alignment, read_reference, ConsensusConfig, ParserConfig,
};
use phynalysis::table::{
    write_changes, write_haplotype_counts, write_mutation_frequencies, HaplotypeTable,
    DEFAULT_RANDOM_STATE,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "phynalysis", about = "Haplotype toolbox for viral deep-sequencing data")]
struct Cli {
    /// Write logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract and count haplotypes from an alignment.
    Haplotypes {
        /// Aligned reads (BAM/SAM).
        input: PathBuf,
        /// Reference file (header line followed by the sequence).
        reference: PathBuf,
        /// Haplotype count table (CSV); stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Keep only changes with quality above this value; 0 disables the filter.
        #[arg(long, default_value_t = 47.0)]
        quality_threshold: f32,
        /// Skip reads whose length differs from the reference by more than this;
        /// negative disables the filter.
        #[arg(long, default_value_t = 100, allow_negative_numbers = true)]
        length_threshold: i64,
        /// Compare bases inside plain `M` operations.
        #[arg(long)]
        compare_matches: bool,
        /// Also write per-change frequencies (CSV).
        #[arg(long)]
        mutations: Option<PathBuf>,
        /// Also write the raw change table (CSV).
        #[arg(long)]
        changes: Option<PathBuf>,
    },
    /// Compute the majority consensus sequence of an alignment.
    Consensus {
        /// Aligned reads (BAM/SAM).
        input: PathBuf,
        /// Reference file (header line followed by the sequence).
        reference: PathBuf,
        /// Consensus FASTA; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Fixed quality threshold; derived from the reference length when omitted.
        #[arg(long)]
        quality_threshold: Option<f32>,
        /// Fraction of reads a change must exceed.
        #[arg(long, default_value_t = 0.5)]
        majority: f64,
    },
    /// Convert a haplotype table into an alignment file.
    Convert {
        /// Haplotype table (CSV).
        input: PathBuf,
        /// Reference file (header line followed by the sequence).
        reference: PathBuf,
        /// Alignment output; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format: fasta, nexus or phylip.
        #[arg(short, long)]
        format: ExportFormat,
        /// Template with {n_tax}, {n_char} and {data} placeholders.
        #[arg(short, long)]
        template: Option<PathBuf>,
        /// Drop haplotypes containing insertions.
        #[arg(long)]
        filter_insertions: bool,
        /// Drop ancestral rows (time 0).
        #[arg(long)]
        exclude_ancestors: bool,
        /// Collapse replicates into one row per haplotype.
        #[arg(long)]
        merge_replicates: bool,
        /// Drop haplotypes seen fewer times than this.
        #[arg(long)]
        min_count: Option<u64>,
        /// Drop haplotypes below this share of their sample's reads.
        #[arg(long)]
        min_frequency: Option<f64>,
        /// Export this many rows drawn by count without replacement; 0 keeps all.
        #[arg(long, default_value_t = 0)]
        n_samples: usize,
        /// Seed for --n-samples.
        #[arg(long, default_value_t = DEFAULT_RANDOM_STATE)]
        random_state: u64,
    },
    /// Keep the most frequent haplotypes of a table.
    Take {
        /// Haplotype table (CSV) with a count column.
        input: PathBuf,
        /// Reduced table (CSV); stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Number of rows to keep; 0 keeps all.
        #[arg(long, default_value_t = 0)]
        n_samples: usize,
    },
    /// Annotate descendant haplotypes with their closest ancestor.
    Ancestors {
        /// Haplotype table (CSV) with a time column.
        input: PathBuf,
        /// Annotated table (CSV); stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Haplotypes {
            input,
            reference,
            output,
            quality_threshold,
            length_threshold,
            compare_matches,
            mutations,
            changes,
        } => {
            let config = ParserConfig::default()
                .with_quality_threshold(quality_threshold)
                .with_length_threshold(length_threshold)
                .with_match_comparison(compare_matches);
            run_haplotypes(&input, &reference, output, &config, mutations, changes)?
        }
        Commands::Consensus {
            input,
            reference,
            output,
            quality_threshold,
            majority,
        } => {
            let mut config = ConsensusConfig::default().with_majority(majority);
            if let Some(threshold) = quality_threshold {
                config = config.with_quality_threshold(threshold);
            }
            run_consensus(&input, &reference, output, &config)?
        }
        Commands::Convert {
            input,
            reference,
            output,
            format,
            template,
            filter_insertions,
            exclude_ancestors,
            merge_replicates,
            min_count,
            min_frequency,
            n_samples,
            random_state,
        } => run_convert(
            &input,
            &reference,
            output,
            format,
            template,
            ConvertOptions {
                filter_insertions,
                exclude_ancestors,
                merge_replicates,
                min_count,
                min_frequency,
                n_samples,
                random_state,
            },
        )?,
        Commands::Take {
            input,
            output,
            n_samples,
        } => run_take(&input, output, n_samples)?,
        Commands::Ancestors { input, output } => run_ancestors(&input, output)?,
    }

    Ok(())
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let writer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            BoxMakeWriter::new(Arc::new(file))
        }
        None => BoxMakeWriter::new(io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(log_file.is_none())
        .init();
    Ok(())
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("failed to create output {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    Ok(writer)
}

fn load_reference(path: &Path) -> Result<String> {
    read_reference(path)
        .with_context(|| format!("failed to read reference from {}", path.display()))
}

fn run_haplotypes(
    input: &Path,
    reference_path: &Path,
    output: Option<PathBuf>,
    config: &ParserConfig,
    mutations_path: Option<PathBuf>,
    changes_path: Option<PathBuf>,
) -> Result<()> {
    info!(
        quality_threshold = ?config.quality_threshold,
        length_threshold = ?config.length_threshold,
        "extracting haplotypes"
    );
    let reference = load_reference(reference_path)?;
    let reads = read_alignment(input)
        .with_context(|| format!("failed to read alignment {}", input.display()))?;
    let table = changes_from_alignment(reference.as_bytes(), &reads, config)
        .context("failed to extract changes")?;

    if let Some(path) = changes_path {
        write_changes(open_output(Some(path.as_path()))?, &table)
            .with_context(|| format!("failed to write changes to {}", path.display()))?;
    }

    let frequencies = mutation_frequencies(&table);
    if let Some(path) = mutations_path {
        write_mutation_frequencies(open_output(Some(path.as_path()))?, &frequencies)
            .with_context(|| format!("failed to write mutations to {}", path.display()))?;
    }

    let counts = count_haplotypes(&table);
    write_haplotype_counts(open_output(output.as_deref())?, &counts)
        .context("failed to write haplotype counts")?;
    Ok(())
}

fn run_consensus(
    input: &Path,
    reference_path: &Path,
    output: Option<PathBuf>,
    config: &ConsensusConfig,
) -> Result<()> {
    let reference = load_reference(reference_path)?;
    let reads = read_alignment(input)
        .with_context(|| format!("failed to read alignment {}", input.display()))?;
    let table = changes_from_alignment(reference.as_bytes(), &reads, &ParserConfig::default())
        .context("failed to extract changes")?;
    let consensus =
        consensus_sequence(&reference, &table, config).context("failed to build consensus")?;
    for change in &consensus.applied {
        info!(%change, "majority change");
    }

    let label = output.as_deref().unwrap_or(input).display().to_string();
    let mut writer = open_output(output.as_deref())?;
    writeln!(writer, ">consensus of {label}\n{}", consensus.sequence)?;
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct ConvertOptions {
    filter_insertions: bool,
    exclude_ancestors: bool,
    merge_replicates: bool,
    min_count: Option<u64>,
    min_frequency: Option<f64>,
    n_samples: usize,
    random_state: u64,
}

fn run_convert(
    input: &Path,
    reference_path: &Path,
    output: Option<PathBuf>,
    format: ExportFormat,
    template_path: Option<PathBuf>,
    options: ConvertOptions,
) -> Result<()> {
    let reference = load_reference(reference_path)?;
    let mut table = HaplotypeTable::from_path(input)
        .with_context(|| format!("failed to read haplotype table {}", input.display()))?;
    info!(rows = table.len(), %format, "loaded haplotype table");

    if options.exclude_ancestors {
        table = table.exclude_ancestors()?;
    }
    if options.filter_insertions {
        table = table.filter_insertions()?;
    }
    if let Some(min_count) = options.min_count {
        table = table.filter_min_count(min_count)?;
    }
    if let Some(min_frequency) = options.min_frequency {
        table = table.filter_min_frequency(min_frequency)?;
    }
    if options.merge_replicates {
        table = table.merge_replicates()?;
    } else {
        table = table.refresh_lineage_ids()?;
    }
    table = table.sample_weighted(options.n_samples, options.random_state)?;

    let template = template_path
        .map(|path| {
            std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read template {}", path.display()))
        })
        .transpose()?;

    let mut writer = open_output(output.as_deref())?;
    export::write(&mut writer, format, &table, &reference, template.as_deref())
        .with_context(|| format!("failed to export {format}"))?;
    Ok(())
}

fn run_take(input: &Path, output: Option<PathBuf>, n_samples: usize) -> Result<()> {
    let table = HaplotypeTable::from_path(input)
        .with_context(|| format!("failed to read haplotype table {}", input.display()))?
        .take_largest(n_samples)?;
    table
        .write_csv(open_output(output.as_deref())?)
        .context("failed to write reduced table")?;
    Ok(())
}

fn run_ancestors(input: &Path, output: Option<PathBuf>) -> Result<()> {
    let table = HaplotypeTable::from_path(input)
        .with_context(|| format!("failed to read haplotype table {}", input.display()))?
        .annotate_closest_ancestors()
        .context("failed to find closest ancestors")?;
    table
        .write_csv(open_output(output.as_deref())?)
        .context("failed to write annotated table")?;
    Ok(())
}
