/// The bundling key that, together with reference position, separates reads that land on
/// the same coordinate but represent distinct orientations, splice patterns, or template
/// footprints.
///
/// Field order is significant: derived `Ord` compares `is_reversed` first, then
/// `is_spliced`, then `read_len`, then (when present) `template_len`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReadGroupKey {
    pub is_reversed: bool,
    pub is_spliced: bool,
    pub read_len: u16,
    pub template_len: i32,
}

impl ReadGroupKey {
    /// Builds the key for a single record.
    ///
    /// `read_len` is zeroed when `--start-only` disables length binning; `template_len` is
    /// zeroed outside paired mode or when `--ignore-tlen` is set.
    pub fn build(
        is_reversed: bool,
        analyzer_is_spliced: bool,
        spliced_option: bool,
        read_len: u16,
        read_length_option: bool,
        template_len: i32,
        paired: bool,
        ignore_tlen: bool,
    ) -> Self {
        ReadGroupKey {
            is_reversed,
            is_spliced: spliced_option && analyzer_is_spliced,
            read_len: if read_length_option { read_len } else { 0 },
            template_len: if paired && !ignore_tlen { template_len } else { 0 },
        }
    }
}
