use rust_htslib::bam::record::Aux;
use rust_htslib::bam::Record;

/// Identifies a single alignment instance of a template: `(qname, tid, pos, mtid, mpos,
/// isize, HI)`.
///
/// `RecordIdentity::mate_of` computes the identity a record's mate would have directly
/// from the record's own fields, without needing to materialize a synthetic mate record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordIdentity {
    pub qname: Vec<u8>,
    pub tid: i32,
    pub pos: i64,
    pub mtid: i32,
    pub mpos: i64,
    pub isize: i64,
    pub hi: i64,
}

impl RecordIdentity {
    /// The identity of `record` itself.
    pub fn of(record: &Record) -> Self {
        RecordIdentity {
            qname: record.qname().to_vec(),
            tid: record.tid(),
            pos: record.pos(),
            mtid: record.mtid(),
            mpos: record.mpos(),
            isize: record.insert_size(),
            hi: hi_tag(record),
        }
    }

    /// The identity `record`'s mate would have, i.e. `record`'s own and mate coordinates
    /// swapped and `isize` negated.
    pub fn mate_of(record: &Record) -> Self {
        RecordIdentity {
            qname: record.qname().to_vec(),
            tid: record.mtid(),
            pos: record.mpos(),
            mtid: record.tid(),
            mpos: record.pos(),
            isize: -record.insert_size(),
            hi: hi_tag(record),
        }
    }
}

/// Reads the integer `HI` aux tag, defaulting to 0 when absent (unpaired single-hit input
/// commonly carries no `HI` tag at all).
pub fn hi_tag(record: &Record) -> i64 {
    match record.aux(b"HI") {
        Ok(Aux::I8(n)) => n as i64,
        Ok(Aux::U8(n)) => n as i64,
        Ok(Aux::I16(n)) => n as i64,
        Ok(Aux::U16(n)) => n as i64,
        Ok(Aux::I32(n)) => n as i64,
        Ok(Aux::U32(n)) => n as i64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_htslib::bam::record::{Cigar, CigarString};
    use rust_htslib::bam::Record;

    fn make_record(tid: i32, pos: i64, mtid: i32, mpos: i64, isize_: i64) -> Record {
        let mut record = Record::new();
        record.set(
            b"read1",
            Some(&CigarString(vec![Cigar::Match(10)])),
            b"ACGTACGTAC",
            &[30; 10],
        );
        record.set_tid(tid);
        record.set_pos(pos);
        record.set_mtid(mtid);
        record.set_mpos(mpos);
        record.set_insert_size(isize_);
        record
    }

    #[test]
    fn mate_of_swaps_coordinates_and_negates_isize() {
        let r1 = make_record(0, 100, 0, 500, 400);
        let r2 = make_record(0, 500, 0, 100, -400);

        assert_eq!(RecordIdentity::mate_of(&r1), RecordIdentity::of(&r2));
        assert_eq!(RecordIdentity::mate_of(&r2), RecordIdentity::of(&r1));
    }
}
