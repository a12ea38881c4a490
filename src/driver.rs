use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_htslib::bam::Record;

use crate::bundle::BundleIndex;
use crate::cigar::analyze_cigar;
use crate::errors::{Error, Result};
use crate::identity::RecordIdentity;
use crate::key::ReadGroupKey;
use crate::mate_index::{MateIndex, MateOffer};
use crate::options::{ChimericPairs, UnpairedReads};

/// Options the driver needs that survive past CLI parsing into the per-record loop.
pub struct DriverOptions {
    pub soft_clip_threshold: u32,
    pub read_length: bool,
    pub spliced: bool,
    pub paired: bool,
    pub ignore_tlen: bool,
    pub chimeric_pairs: ChimericPairs,
    pub unpaired_reads: UnpairedReads,
    pub seed: u64,
}

/// Streaming position/UMI deduplication driver.
///
/// Consumes coordinate-sorted records one at a time via [`Driver::offer`], internally
/// sliding an eviction horizon over the bundle index, and yields already-ordered output
/// records as it goes. Call [`Driver::finish`] once the input is exhausted to flush
/// everything still resident.
pub struct Driver {
    opts: DriverOptions,
    bundles: BundleIndex,
    mates: MateIndex,
    rng: StdRng,
    last_ref: i32,
    last_output_pos: i64,
    seen_any: bool,
}

impl Driver {
    pub fn new(opts: DriverOptions) -> Self {
        let rng = StdRng::seed_from_u64(opts.seed);
        Driver {
            opts,
            bundles: BundleIndex::new(),
            mates: MateIndex::new(),
            rng,
            last_ref: -1,
            last_output_pos: 0,
            seen_any: false,
        }
    }

    /// Offers one input record. Returns any records that became ready to emit as a
    /// consequence (horizon flush output, or an immediate paired late-pairing emission).
    pub fn offer(&mut self, record: Record) -> Result<Vec<Record>> {
        if record.is_unmapped() {
            return Ok(Vec::new());
        }

        if self.opts.paired && record.is_last_in_template() {
            return Ok(self.offer_read2(&record));
        }

        let cigar = record.cigar();
        let analysis = analyze_cigar(&cigar, record.is_reverse(), self.opts.soft_clip_threshold);

        let mut out = Vec::new();
        let tid = record.tid();
        if self.seen_any && tid != self.last_ref {
            out.extend(self.flush_ready(None));
            self.last_output_pos = 0;
        } else if self.last_output_pos + crate::bundle::HORIZON < analysis.start {
            out.extend(self.flush_ready(Some(analysis.start)));
            self.last_output_pos = analysis.start;
        }

        self.last_ref = tid;
        self.seen_any = true;

        if self.opts.paired && record.tid() != record.mtid() && self.opts.chimeric_pairs.is_discard() {
            self.mates.evict(&RecordIdentity::of(&record));
            return Ok(out);
        }

        let umi = extract_umi(record.qname())?;
        let key = ReadGroupKey::build(
            record.is_reverse(),
            analysis.is_spliced,
            self.opts.spliced,
            record.seq_len() as u16,
            self.opts.read_length,
            record.insert_size() as i32,
            self.opts.paired,
            self.opts.ignore_tlen,
        );

        if self.opts.paired {
            self.mates.track_survivor(RecordIdentity::of(&record));
        }
        self.bundles.offer(analysis.pos, key, umi, record, &mut self.rng);

        Ok(out)
    }

    fn offer_read2(&mut self, r2: &Record) -> Vec<Record> {
        match self.mates.offer_read2(r2, self.opts.chimeric_pairs) {
            MateOffer::EmitPair(a, b) => vec![a, b],
            MateOffer::Stashed | MateOffer::Discarded => Vec::new(),
        }
    }

    fn flush_ready(&mut self, before: Option<i64>) -> Vec<Record> {
        let flushed = self.bundles.flush(before);
        let mut out = Vec::new();
        for bundle in flushed {
            for entry in bundle.survivors {
                if self.opts.paired {
                    let identity = RecordIdentity::of(&entry.survivor);
                    out.extend(self.mates.resolve_on_flush(entry.survivor, &identity));
                } else {
                    out.push(entry.survivor);
                }
            }
        }
        out
    }

    /// End-of-stream: flush every remaining bundle and drain unresolved paired reads.
    pub fn finish(mut self) -> Vec<Record> {
        let mut out = self.flush_ready(None);
        if self.opts.paired {
            out.extend(self.mates.drain_unpaired(self.opts.unpaired_reads));
        }
        out
    }
}

/// Extracts the UMI as the substring of `qname` after the last `_`.
pub fn extract_umi(qname: &[u8]) -> Result<Vec<u8>> {
    match qname.iter().rposition(|&b| b == b'_') {
        Some(idx) => Ok(qname[idx + 1..].to_vec()),
        None => Err(Error::UmiNotFound { qname: String::from_utf8_lossy(qname).into_owned() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn umi_is_substring_after_last_underscore() {
        assert_eq!(extract_umi(b"read1_AAAA").unwrap(), b"AAAA");
        assert_eq!(extract_umi(b"read_with_parts_CCGT").unwrap(), b"CCGT");
    }

    #[test]
    fn missing_underscore_is_an_error() {
        assert!(extract_umi(b"readwithoutumi").is_err());
    }
}
