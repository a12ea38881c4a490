use thiserror::Error;

/// Error hierarchy shared by all three binaries.
///
/// Each binary's `main` is the single join point that formats one of these with
/// `log::error!("{:#}", err)` and exits with the status returned by [`Error::exit_code`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("{path} is not coordinate-sorted (missing or mismatched SO:coordinate in @HD)")]
    NotCoordinateSorted { path: String },

    #[error("ambiguous {kind} indices on lane {lane}: '{a}' and '{b}' differ by only {distance} (must exceed {allowed})")]
    AmbiguousIndex {
        kind: &'static str,
        lane: u32,
        a: String,
        b: String,
        distance: usize,
        allowed: usize,
    },

    #[error("not all {kind} indices on lane {lane} have the same length")]
    UnevenIndexLength { kind: &'static str, lane: u32 },

    #[error("sample sheet is missing required column '{0}'")]
    MissingSampleSheetColumn(&'static str),

    #[error("output pattern '{0}' is missing mandatory placeholder '%l'")]
    MissingLanePlaceholder(String),

    #[error("output pattern '{0}' must contain at least one of '%i' or '%s'")]
    MissingSampleNamePlaceholder(String),

    #[error("read '{qname}' has no '_' separator before its UMI")]
    UmiNotFound { qname: String },

    #[error("could not extract lane from FASTQ header: {header}")]
    LaneNotFound { header: String },

    #[error("unrecognized input format for '{0}' (expected .sam, .bam, or '-')")]
    UnknownAlignmentFormat(String),

    #[error("unrecognized FASTQ format for '{0}' (expected .fastq[.gz] or .fq[.gz])")]
    UnknownFastqFormat(String),

    #[error("htslib error")]
    Htslib(#[from] rust_htslib::errors::Error),

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("CSV error")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// All errors in this hierarchy are fatal; the process always exits 1 on error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

pub type Result<T> = std::result::Result<T, Error>;
