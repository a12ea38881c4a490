use std::collections::BTreeMap;

use rust_htslib::bam::Record;

use crate::key::ReadGroupKey;
use crate::selector::{offer_candidate, BundleEntry};

/// Reference bases beyond which a resident position may be evicted from the bundle index.
pub const HORIZON: i64 = 1000;

type UmiMap = std::collections::HashMap<Vec<u8>, BundleEntry>;

/// Nested `pos -> key -> umi -> entry` index. Positions are kept in a `BTreeMap` so flushing
/// can walk residents in ascending order without re-sorting on every call.
#[derive(Default)]
pub struct BundleIndex {
    positions: BTreeMap<i64, BTreeMap<ReadGroupKey, UmiMap>>,
}

/// A flushed (pos, key) bundle, handed to the output sink.
pub struct FlushedBundle {
    pub pos: i64,
    pub key: ReadGroupKey,
    pub survivors: Vec<BundleEntry>,
}

impl BundleIndex {
    pub fn new() -> Self {
        BundleIndex::default()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Offers a candidate record at `pos` under `key`/`umi`, creating a fresh entry if this
    /// is the first observation, or running it through the survivor selector otherwise.
    pub fn offer(
        &mut self,
        pos: i64,
        key: ReadGroupKey,
        umi: Vec<u8>,
        candidate: Record,
        rng: &mut rand::rngs::StdRng,
    ) {
        let umis = self.positions.entry(pos).or_default().entry(key).or_default();
        match umis.get_mut(&umi) {
            Some(entry) => {
                offer_candidate(entry, &candidate, rng);
            }
            None => {
                umis.insert(umi, BundleEntry::new(candidate));
            }
        }
    }

    /// Flushes every resident position `p` for which `p + HORIZON < before` (or, when
    /// `before` is `None`, every resident position unconditionally — end-of-stream or
    /// reference-change flush). Positions and, within each, keys are emitted in ascending
    /// order so the output stream stays coordinate-monotone.
    pub fn flush(&mut self, before: Option<i64>) -> Vec<FlushedBundle> {
        let cutoff: Vec<i64> = self
            .positions
            .keys()
            .copied()
            .filter(|&p| before.map_or(true, |start| p + HORIZON < start))
            .collect();

        let mut flushed = Vec::new();
        for pos in cutoff {
            let keys = self.positions.remove(&pos).unwrap_or_default();
            for (key, umis) in keys {
                let survivors: Vec<BundleEntry> = umis.into_values().collect();
                flushed.push(FlushedBundle { pos, key, survivors });
            }
        }
        flushed
    }
}
