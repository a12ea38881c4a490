use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// What to do with a chimeric pair (a read whose mate maps to a different reference) in
/// paired dedup mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChimericPairs {
    Use,
    Discard,
}

/// What to do with a survivor whose mate was never observed by end-of-stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum UnpairedReads {
    Use,
    Discard,
}

/// CLI surface for the `dedup` binary.
#[derive(Parser, Debug)]
#[command(name = "dedup", about = "Deduplicate position/UMI bundles in a coordinate-sorted alignment file")]
pub struct DedupOptions {
    /// Input SAM/BAM file ('-' for stdin SAM).
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output SAM/BAM file ('-' for stdout SAM).
    #[arg(short, long)]
    pub output: PathBuf,

    /// Disable read-length binning in the bundling key (read_len is always 0).
    #[arg(long)]
    pub start_only: bool,

    /// Enable mate-aware paired-end deduplication.
    #[arg(long)]
    pub paired: bool,

    /// Fold the splice flag (derived from the CIGAR) into the bundling key.
    #[arg(long)]
    pub spliced: bool,

    /// Ignore template length when building the paired bundling key.
    #[arg(long)]
    pub ignore_tlen: bool,

    /// How to handle chimeric pairs (mate on a different reference) in paired mode.
    #[arg(long, value_enum, default_value_t = ChimericPairs::Use)]
    pub chimeric_pairs: ChimericPairs,

    /// How to handle survivors whose mate never arrived, in paired mode.
    #[arg(long, value_enum, default_value_t = UnpairedReads::Use)]
    pub unpaired_reads: UnpairedReads,

    /// Write an uncompressed BAM (ignored for SAM output).
    #[arg(long)]
    pub uncompressed: bool,

    /// Soft-clip length above which a trailing/leading clip counts as a splice event.
    #[arg(long, default_value_t = 4)]
    pub soft_clip_threshold: u32,

    /// Seed for the reservoir-sampling PRNG; fixes output for a fixed input order.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 1)]
    pub input_threads: u32,

    #[arg(long, default_value_t = 1)]
    pub output_threads: u32,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl ChimericPairs {
    pub fn is_discard(self) -> bool {
        matches!(self, ChimericPairs::Discard)
    }
}

impl UnpairedReads {
    pub fn is_use(self) -> bool {
        matches!(self, UnpairedReads::Use)
    }
}

impl std::fmt::Display for ChimericPairs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ChimericPairs::Use => "use",
            ChimericPairs::Discard => "discard",
        })
    }
}

impl std::fmt::Display for UnpairedReads {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UnpairedReads::Use => "use",
            UnpairedReads::Discard => "discard",
        })
    }
}

/// CLI surface for the `demultiplex` binary.
#[derive(Parser, Debug)]
#[command(name = "demultiplex", about = "Demultiplex a FASTQ stream into per-sample files by dual-index barcode")]
pub struct DemuxOptions {
    /// Input FASTQ file, plain or gzip.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Illumina sample sheet (CSV, optionally preceded by a [Data] marker).
    #[arg(short, long)]
    pub sample_sheet: PathBuf,

    /// Output filename pattern; placeholders %i, %s, %l. Gzip-compressed if it ends in .gz.
    #[arg(short, long)]
    pub output: String,

    /// Maximum allowed Hamming distance per index (i7 or i5) at lookup time.
    #[arg(short = 'e', long, default_value_t = 1)]
    pub max_errors: u32,

    /// Append the UMI found between the indices onto the FASTQ header.
    #[arg(long)]
    pub format_umi: bool,

    /// Use the ':FUMI|<UMI>|' tag form instead of the legacy '_<UMI>' suffix.
    #[arg(long)]
    pub tag_umi: bool,

    /// Restrict/override which lanes are recognized; repeatable. Overrides the sheet's Lane column.
    #[arg(short, long)]
    pub lane: Vec<u32>,

    #[arg(long, default_value_t = 1)]
    pub threads: u32,

    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// CLI surface for the `fix_flags` binary.
#[derive(Parser, Debug)]
#[command(name = "fix_flags", about = "Repair secondary/primary flags and NH/HI/XS tags within multi-hit read-name groups")]
pub struct FixFlagsOptions {
    #[arg(short, long)]
    pub input: PathBuf,

    #[arg(short, long)]
    pub output: PathBuf,

    /// Final sort by (tid, min(pos,mpos), max(pos,mpos), pattern) instead of the R1/R2 flag byte only.
    #[arg(long)]
    pub sort_adjacent_pairs: bool,

    #[arg(long, default_value_t = 1)]
    pub input_threads: u32,

    #[arg(long, default_value_t = 1)]
    pub output_threads: u32,

    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
