use rand::rngs::StdRng;
use rand::Rng;
use rust_htslib::bam::Record;

/// A single (pos, key, umi) bundle entry: the current survivor, its multiplicity, and the
/// reservoir counter used to keep the MAPQ-tie-break uniform.
pub struct BundleEntry {
    pub survivor: Record,
    pub multiplicity: u64,
    reservoir_count: u64,
}

impl BundleEntry {
    pub fn new(record: Record) -> Self {
        BundleEntry { survivor: record, multiplicity: 1, reservoir_count: 1 }
    }
}

/// Applies the survivor-selection rule to an existing bundle entry: MAPQ dominance breaks
/// ties deterministically, equal MAPQ falls back to uniform reservoir sampling driven by
/// an explicit, caller-owned `StdRng` rather than a process-wide global.
///
/// Returns `true` if `candidate` replaced the stored survivor.
pub fn offer_candidate(entry: &mut BundleEntry, candidate: &Record, rng: &mut StdRng) -> bool {
    entry.multiplicity += 1;

    let candidate_mapq = candidate.mapq();
    let survivor_mapq = entry.survivor.mapq();

    if candidate_mapq < survivor_mapq {
        return false;
    }

    if candidate_mapq > survivor_mapq {
        entry.survivor = candidate.clone();
        entry.reservoir_count = 1;
        return true;
    }

    entry.reservoir_count += 1;
    let threshold = 1.0 / entry.reservoir_count as f64;
    if rng.gen::<f64>() < threshold {
        entry.survivor = candidate.clone();
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rust_htslib::bam::record::{Cigar, CigarString};

    fn record_with_mapq(mapq: u8) -> Record {
        let mut r = Record::new();
        r.set(b"r", Some(&CigarString(vec![Cigar::Match(10)])), b"ACGTACGTAC", &[30; 10]);
        r.set_mapq(mapq);
        r
    }

    #[test]
    fn lower_mapq_candidate_is_discarded() {
        let mut entry = BundleEntry::new(record_with_mapq(30));
        let mut rng = StdRng::seed_from_u64(1);
        let replaced = offer_candidate(&mut entry, &record_with_mapq(10), &mut rng);
        assert!(!replaced);
        assert_eq!(entry.survivor.mapq(), 30);
        assert_eq!(entry.multiplicity, 2);
    }

    #[test]
    fn higher_mapq_candidate_always_replaces() {
        let mut entry = BundleEntry::new(record_with_mapq(10));
        let mut rng = StdRng::seed_from_u64(1);
        let replaced = offer_candidate(&mut entry, &record_with_mapq(30), &mut rng);
        assert!(replaced);
        assert_eq!(entry.survivor.mapq(), 30);
    }

    #[test]
    fn equal_mapq_reservoir_sampling_is_asymptotically_uniform() {
        const N: usize = 5;
        const TRIALS: usize = 20_000;
        let mut wins = [0usize; N];

        for seed in 0..TRIALS as u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut entry = BundleEntry::new(record_with_mapq(20));
            let mut survivor_index = 0usize;
            for i in 1..N {
                if offer_candidate(&mut entry, &record_with_mapq(20), &mut rng) {
                    survivor_index = i;
                }
            }
            wins[survivor_index] += 1;
        }

        let expected = TRIALS as f64 / N as f64;
        for count in wins {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(deviation < 0.1, "reservoir sampling is not close to uniform: {:?}", wins);
        }
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        let mut entry_a = BundleEntry::new(record_with_mapq(20));
        let mut entry_b = BundleEntry::new(record_with_mapq(20));

        let mut replaced_a = vec![];
        let mut replaced_b = vec![];
        for _ in 0..10 {
            replaced_a.push(offer_candidate(&mut entry_a, &record_with_mapq(20), &mut rng_a));
            replaced_b.push(offer_candidate(&mut entry_b, &record_with_mapq(20), &mut rng_b));
        }
        assert_eq!(replaced_a, replaced_b);
    }
}
