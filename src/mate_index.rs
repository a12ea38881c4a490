use std::collections::{HashMap, HashSet};

use rust_htslib::bam::Record;

use crate::identity::RecordIdentity;
use crate::options::{ChimericPairs, UnpairedReads};

/// Bookkeeping for paired-mode mate resolution across the sliding bundle horizon.
///
/// `current_reads` tracks every survivor identity still resident in the bundle index (not
/// yet flushed); `paired_read_map` holds read-2 records waiting on a read-1 survivor to
/// flush; `not_yet_paired_reads` holds read-1 survivors already flushed but still waiting
/// on a read-2 that has not arrived yet.
#[derive(Default)]
pub struct MateIndex {
    pub current_reads: HashSet<RecordIdentity>,
    pub paired_read_map: HashMap<RecordIdentity, Record>,
    pub not_yet_paired_reads: HashMap<RecordIdentity, Record>,
}

/// Outcome of offering a read-2 record to the mate index.
pub enum MateOffer {
    /// Stashed for later resolution; nothing to emit yet.
    Stashed,
    /// A late-pairing hit: both records should be written to output now.
    EmitPair(Record, Record),
    /// Discarded (no plausible read-1 survivor, or chimeric pair under `Discard`).
    Discarded,
}

impl MateIndex {
    pub fn new() -> Self {
        MateIndex::default()
    }

    /// Handles arrival of a read-2 record (spec'd mate-handling read-2 arrival rule).
    pub fn offer_read2(&mut self, r2: &Record, chimeric_pairs: ChimericPairs) -> MateOffer {
        if r2.tid() != r2.mtid() && chimeric_pairs.is_discard() {
            self.paired_read_map.remove(&RecordIdentity::mate_of(r2));
            return MateOffer::Discarded;
        }

        let mate_identity = RecordIdentity::mate_of(r2);
        let read1_has_passed = (r2.mtid() == r2.tid() && r2.mpos() < r2.pos()) || r2.mtid() < r2.tid();

        if read1_has_passed {
            if self.current_reads.contains(&mate_identity) {
                self.paired_read_map.insert(mate_identity, r2.clone());
                MateOffer::Stashed
            } else if let Some(r1) = self.not_yet_paired_reads.remove(&mate_identity) {
                MateOffer::EmitPair(r1, r2.clone())
            } else {
                MateOffer::Discarded
            }
        } else {
            self.paired_read_map.insert(mate_identity, r2.clone());
            MateOffer::Stashed
        }
    }

    pub fn track_survivor(&mut self, identity: RecordIdentity) {
        self.current_reads.insert(identity);
    }

    /// Clears a stale stashed mate for a read-1 identity that is being discarded as chimeric.
    pub fn evict(&mut self, identity: &RecordIdentity) {
        self.paired_read_map.remove(identity);
    }

    /// Resolves a flushed survivor against the mate index (bundle-flush paired rule).
    ///
    /// Returns the records to emit now: `[survivor, mate]` on a hit in `paired_read_map`,
    /// or just `survivor` alone if its mate is unmapped. Otherwise the mate hasn't arrived
    /// yet (coordinate-sorted input guarantees it would already be stashed if it had), so
    /// `survivor` is parked in `not_yet_paired_reads` until it does, or until end-of-stream.
    pub fn resolve_on_flush(&mut self, survivor: Record, survivor_identity: &RecordIdentity) -> Vec<Record> {
        self.current_reads.remove(survivor_identity);

        if survivor.is_mate_unmapped() {
            return vec![survivor];
        }

        if let Some(mate) = self.paired_read_map.remove(survivor_identity) {
            return vec![survivor, mate];
        }

        self.not_yet_paired_reads.insert(survivor_identity.clone(), survivor);
        Vec::new()
    }

    /// End-of-stream drain: everything still parked in `not_yet_paired_reads` is emitted or
    /// dropped according to `unpaired_reads`.
    pub fn drain_unpaired(&mut self, unpaired_reads: UnpairedReads) -> Vec<Record> {
        let leftovers: Vec<Record> = self.not_yet_paired_reads.drain().map(|(_, r)| r).collect();
        if unpaired_reads.is_use() {
            leftovers
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_htslib::bam::record::{Cigar, CigarString};

    fn record(tid: i32, pos: i64, mtid: i32, mpos: i64, isize_: i64, last_in_template: bool, mate_unmapped: bool) -> Record {
        let mut r = Record::new();
        r.set(b"r1", Some(&CigarString(vec![Cigar::Match(10)])), b"ACGTACGTAC", &[30; 10]);
        r.set_tid(tid);
        r.set_pos(pos);
        r.set_mtid(mtid);
        r.set_mpos(mpos);
        r.set_insert_size(isize_);
        r.set_paired();
        if last_in_template {
            r.set_last_in_template();
        } else {
            r.set_first_in_template();
        }
        if mate_unmapped {
            r.set_mate_unmapped();
        }
        r
    }

    #[test]
    fn read2_stashes_when_read1_not_yet_flushed() {
        let mut idx = MateIndex::new();
        let r1 = record(0, 100, 0, 500, 400, false, false);
        idx.track_survivor(RecordIdentity::of(&r1));

        let r2 = record(0, 500, 0, 100, -400, true, false);
        let outcome = idx.offer_read2(&r2, ChimericPairs::Use);
        assert!(matches!(outcome, MateOffer::Stashed));
        assert!(idx.paired_read_map.contains_key(&RecordIdentity::mate_of(&r2)));
    }

    #[test]
    fn read2_late_pairing_hits_not_yet_paired_reads() {
        let mut idx = MateIndex::new();
        let r1 = record(0, 100, 0, 500, 400, false, false);
        idx.not_yet_paired_reads.insert(RecordIdentity::of(&r1), r1.clone());

        let r2 = record(0, 500, 0, 100, -400, true, false);
        let outcome = idx.offer_read2(&r2, ChimericPairs::Use);
        match outcome {
            MateOffer::EmitPair(a, b) => {
                assert_eq!(a.pos(), 100);
                assert_eq!(b.pos(), 500);
            }
            _ => panic!("expected EmitPair"),
        }
    }

    #[test]
    fn read2_discarded_when_read1_neither_resident_nor_parked() {
        let mut idx = MateIndex::new();
        let r2 = record(0, 500, 0, 100, -400, true, false);
        let outcome = idx.offer_read2(&r2, ChimericPairs::Use);
        assert!(matches!(outcome, MateOffer::Discarded));
    }

    #[test]
    fn chimeric_pair_discarded_evicts_stashed_entry() {
        let mut idx = MateIndex::new();
        let stale = record(0, 500, 1, 100, -400, true, false);
        idx.paired_read_map.insert(RecordIdentity::mate_of(&stale), stale.clone());

        let outcome = idx.offer_read2(&stale, ChimericPairs::Discard);
        assert!(matches!(outcome, MateOffer::Discarded));
        assert!(!idx.paired_read_map.contains_key(&RecordIdentity::mate_of(&stale)));
    }

    #[test]
    fn flush_with_unmapped_mate_emits_immediately() {
        let mut idx = MateIndex::new();
        let r1 = record(0, 100, 0, 500, 400, false, true);
        let identity = RecordIdentity::of(&r1);
        idx.track_survivor(identity.clone());
        let emitted = idx.resolve_on_flush(r1, &identity);
        assert_eq!(emitted.len(), 1);
    }

    #[test]
    fn flush_with_hit_in_paired_map_emits_pair() {
        let mut idx = MateIndex::new();
        let r1 = record(0, 100, 0, 500, 400, false, false);
        let identity = RecordIdentity::of(&r1);
        idx.track_survivor(identity.clone());

        let r2 = record(0, 500, 0, 100, -400, true, false);
        idx.paired_read_map.insert(identity.clone(), r2);

        let emitted = idx.resolve_on_flush(r1, &identity);
        assert_eq!(emitted.len(), 2);
        assert!(idx.paired_read_map.is_empty());
    }

    #[test]
    fn flush_with_no_hit_parks_in_not_yet_paired() {
        let mut idx = MateIndex::new();
        let r1 = record(0, 100, 0, 500, 400, false, false);
        let identity = RecordIdentity::of(&r1);
        idx.track_survivor(identity.clone());

        let emitted = idx.resolve_on_flush(r1, &identity);
        assert!(emitted.is_empty());
        assert!(idx.not_yet_paired_reads.contains_key(&identity));
    }

    #[test]
    fn drain_unpaired_respects_discard_option() {
        let mut idx = MateIndex::new();
        let r1 = record(0, 100, 0, 500, 400, false, false);
        idx.not_yet_paired_reads.insert(RecordIdentity::of(&r1), r1);
        let drained = idx.drain_unpaired(UnpairedReads::Discard);
        assert!(drained.is_empty());
    }

    #[test]
    fn drain_unpaired_respects_use_option() {
        let mut idx = MateIndex::new();
        let r1 = record(0, 100, 0, 500, 400, false, false);
        idx.not_yet_paired_reads.insert(RecordIdentity::of(&r1), r1);
        let drained = idx.drain_unpaired(UnpairedReads::Use);
        assert_eq!(drained.len(), 1);
    }
}
