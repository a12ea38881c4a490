use rust_htslib::bam::header::HeaderRecord;
use rust_htslib::bam::record::{Cigar, CigarString};
use rust_htslib::bam::{Format, Header, Read, Reader, Record, Writer};
use std::path::Path;

/// A coordinate-sorted two-reference header (chr1 = tid 0, chr2 = tid 1), matching every
/// fixture BAM below.
pub fn coordinate_sorted_header() -> Header {
    let mut header = Header::new();
    let mut hd = HeaderRecord::new(b"HD");
    hd.push_tag(b"VN", "1.6");
    hd.push_tag(b"SO", "coordinate");
    header.push_record(&hd);

    for name in ["chr1", "chr2"] {
        let mut sq = HeaderRecord::new(b"SQ");
        sq.push_tag(b"SN", name);
        sq.push_tag(b"LN", &1_000_000i64);
        header.push_record(&sq);
    }
    header
}

pub fn plain_record(qname: &[u8], tid: i32, pos: i64, mapq: u8, reverse: bool) -> Record {
    let mut r = Record::new();
    r.set(qname, Some(&CigarString(vec![Cigar::Match(36)])), b"ACGTACGTACGTACGTACGTACGTACGTACGTACGT", &[30; 36]);
    r.set_tid(tid);
    r.set_pos(pos);
    r.set_mapq(mapq);
    if reverse {
        r.set_reverse();
    }
    r
}

pub fn paired_record(
    qname: &[u8],
    tid: i32,
    pos: i64,
    mapq: u8,
    mtid: i32,
    mpos: i64,
    isize_: i64,
    first: bool,
) -> Record {
    let mut r = plain_record(qname, tid, pos, mapq, false);
    r.set_paired();
    r.set_mtid(mtid);
    r.set_mpos(mpos);
    r.set_insert_size(isize_);
    if first {
        r.set_first_in_template();
    } else {
        r.set_last_in_template();
    }
    r
}

/// Writes `records` to a fresh BAM at `path` under a coordinate-sorted single-reference header.
pub fn write_bam(path: &Path, records: &[Record]) {
    let header = coordinate_sorted_header();
    let mut writer = Writer::from_path(path, &header, Format::Bam).unwrap();
    for r in records {
        writer.write(r).unwrap();
    }
}

pub fn read_bam(path: &Path) -> Vec<Record> {
    let mut reader = Reader::from_path(path).unwrap();
    reader.records().map(|r| r.unwrap()).collect()
}
