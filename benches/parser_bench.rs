//! Throughput of the CIGAR walk and haplotype aggregation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use phynalysis::genomics::{
    changes_from_alignment, count_haplotypes, haplotypes_to_sequences, AlignedRead, CigarOp,
    CigarOpKind, ParserConfig,
};

const REFERENCE_LEN: usize = 10_000;
const READS: usize = 500;

fn reference() -> Vec<u8> {
    b"ACGT".iter().copied().cycle().take(REFERENCE_LEN).collect()
}

fn reads(reference: &[u8]) -> Vec<AlignedRead> {
    (0..READS)
        .map(|index| {
            let mut sequence = reference.to_vec();
            let site = (index * 37) % REFERENCE_LEN;
            sequence[site] = if sequence[site] == b'A' { b'G' } else { b'A' };
            AlignedRead::new(
                format!("read{index};block_id={};", index % 4),
                0,
                vec![CigarOp::new(CigarOpKind::Mismatch, REFERENCE_LEN as u32)],
                sequence,
                Some(vec![40; REFERENCE_LEN]),
            )
        })
        .collect()
}

fn benchmark_parser(c: &mut Criterion) {
    let reference = reference();
    let reads = reads(&reference);
    let config = ParserConfig::default().with_quality_threshold(30.0);

    c.bench_function("changes_from_alignment/500x10k", |b| {
        b.iter(|| {
            let table = changes_from_alignment(black_box(&reference), &reads, &config)
                .expect("scan succeeds");
            black_box(count_haplotypes(&table));
        });
    });

    let reference_text = String::from_utf8(reference).expect("ASCII reference");
    let haplotypes: Vec<String> = (0..64)
        .map(|index| format!("{}:iTT;{}:del2", index * 100, index * 100 + 50))
        .collect();
    c.bench_function("haplotypes_to_sequences/64x10k", |b| {
        b.iter(|| {
            black_box(
                haplotypes_to_sequences(&reference_text, haplotypes.iter(), None)
                    .expect("materialisation succeeds"),
            );
        });
    });
}

criterion_group!(benches, benchmark_parser);
criterion_main!(benches);
