use std::io::Write;
use std::path::Path;

use phynalysis::genomics::{
    changes_from_alignment, count_haplotypes, read_alignment, read_reference, CigarOpKind,
    IoError, ParserConfig,
};
use rust_htslib::bam::header::{Header, HeaderRecord};
use rust_htslib::bam::record::{Cigar, CigarString};
use rust_htslib::bam::{Format, Record, Writer};

fn fixture_writer(path: &Path, reference_name: &str, reference_len: usize) -> Writer {
    let mut sequence = HeaderRecord::new(b"SQ");
    sequence.push_tag(b"SN", reference_name);
    sequence.push_tag(b"LN", &(reference_len as i64));
    let mut header = Header::new();
    header.push_record(&sequence);
    Writer::from_path(path, &header, Format::Bam).expect("writer opens")
}

fn record(name: &[u8], cigar: Vec<Cigar>, sequence: &[u8], qualities: &[u8]) -> Record {
    let mut record = Record::new();
    record.set(name, Some(&CigarString(cigar)), sequence, qualities);
    record.set_tid(0);
    record.set_pos(0);
    record.set_mapq(60);
    record
}

#[test]
fn bam_records_become_haplotypes() {
    let dir = tempfile::tempdir().expect("temp dir");
    let bam_path = dir.path().join("reads.bam");
    let reference_path = dir.path().join("reference.fasta");

    std::fs::File::create(&reference_path)
        .and_then(|mut file| file.write_all(b">ref\nAAAA\nAA\n"))
        .expect("reference written");

    {
        let mut writer = fixture_writer(&bam_path, "ref", 6);
        let reads = [
            record(
                b"r0;block_id=a;",
                vec![
                    Cigar::Equal(2),
                    Cigar::Ins(2),
                    Cigar::Equal(2),
                    Cigar::Diff(1),
                    Cigar::Equal(1),
                ],
                b"AATTAAGA",
                &[30, 30, 40, 20, 30, 30, 50, 30],
            ),
            record(b"r1;block_id=a;", vec![Cigar::Equal(6)], b"AAAAAA", &[30; 6]),
            record(
                b"r2;block_id=a;",
                vec![Cigar::Equal(1), Cigar::Del(2), Cigar::Equal(3)],
                b"AAAA",
                &[30; 4],
            ),
        ];
        for read in &reads {
            writer.write(read).expect("record written");
        }
    }

    let reference = read_reference(&reference_path).expect("reference reads");
    assert_eq!(reference, "AAAAAA");

    let reads = read_alignment(&bam_path).expect("alignment reads");
    assert_eq!(reads.len(), 3);
    assert_eq!(&*reads[0].name, "r0;block_id=a;");
    assert_eq!(&*reads[0].sequence, b"AATTAAGA");
    assert_eq!(reads[0].cigar[1].kind().expect("known op"), CigarOpKind::Insertion);
    assert_eq!(reads[0].quality_at(6), Some(50));

    let config = ParserConfig::default().with_quality_threshold(25.0);
    let table =
        changes_from_alignment(reference.as_bytes(), &reads, &config).expect("scan succeeds");
    let rendered: Vec<String> = table.records.iter().map(|r| r.change.to_string()).collect();
    // deletions carry quality 0 and fall below the threshold
    assert_eq!(rendered, vec!["2:iTT", "4:A->G"]);

    let counts = count_haplotypes(&table);
    let rows: Vec<(&str, u64)> = counts
        .iter()
        .map(|c| (c.haplotype.as_str(), c.count))
        .collect();
    assert_eq!(rows, vec![("consensus", 2), ("2:iTT;4:A->G", 1)]);
}

#[test]
fn reference_without_sequence_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("empty.fasta");
    std::fs::write(&path, ">ref only\n").expect("reference written");
    assert!(matches!(read_reference(&path), Err(IoError::EmptyReference(_))));
}
