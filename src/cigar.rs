use rust_htslib::bam::record::{Cigar, CigarStringView};

/// Derives the 5′ unclipped bundling coordinate and the leftmost alignment start from a
/// CIGAR, plus whether the read should be treated as spliced.
pub struct CigarAnalysis {
    /// Leftmost reference coordinate of the alignment, including leading soft-clips.
    pub start: i64,
    /// Effective 5′ unclipped coordinate used for bundling.
    pub pos: i64,
    pub is_spliced: bool,
}

/// Runs the cigar analyzer for a single record's strand and cigar.
pub fn analyze_cigar(cigar: &CigarStringView, is_reverse: bool, soft_clip_threshold: u32) -> CigarAnalysis {
    if is_reverse {
        analyze_reverse(cigar, soft_clip_threshold)
    } else {
        analyze_forward(cigar, soft_clip_threshold)
    }
}

fn analyze_forward(cigar: &CigarStringView, soft_clip_threshold: u32) -> CigarAnalysis {
    let leftmost = cigar.pos();
    let first = cigar.first();
    let last = cigar.last();

    let pos = match first {
        Some(Cigar::SoftClip(len)) => leftmost - i64::from(*len),
        _ => leftmost,
    };
    let start = pos;

    let has_ref_skip = cigar.iter().any(|c| matches!(c, Cigar::RefSkip(_)));
    let trailing_splice_clip = matches!(last, Some(Cigar::SoftClip(len)) if *len > soft_clip_threshold);
    let is_spliced = has_ref_skip || trailing_splice_clip;

    CigarAnalysis { start, pos, is_spliced }
}

fn analyze_reverse(cigar: &CigarStringView, soft_clip_threshold: u32) -> CigarAnalysis {
    let leftmost = cigar.pos();
    let first = cigar.first();
    let last = cigar.last();

    let aln_len = ref_consumed_len(cigar);
    let mut pos = leftmost + aln_len;
    if let Some(Cigar::SoftClip(len)) = last {
        pos += i64::from(*len);
    }
    let start = leftmost;

    let has_ref_skip = cigar.iter().any(|c| matches!(c, Cigar::RefSkip(_)));
    let leading_splice_clip = matches!(first, Some(Cigar::SoftClip(len)) if *len > soft_clip_threshold);
    let is_spliced = has_ref_skip || leading_splice_clip;

    CigarAnalysis { start, pos, is_spliced }
}

fn ref_consumed_len(cigar: &CigarStringView) -> i64 {
    cigar
        .iter()
        .map(|c| match c {
            Cigar::Match(len) | Cigar::Del(len) | Cigar::RefSkip(len) | Cigar::Equal(len) | Cigar::Diff(len) => {
                i64::from(*len)
            }
            _ => 0,
        })
        .sum()
}

/// Distance, in reference bases, from the relevant end of the read to the first splice
/// event (an `N` op or a non-leading soft clip). Only `is_spliced` (a boolean derived from
/// whether this is nonzero, see callers) is folded into the bundling key today; the
/// numeric offset itself is preserved for a future clustering UMI method.
pub fn find_splice(cigar: &CigarStringView, reverse: bool) -> u32 {
    let ops: Vec<&Cigar> = if reverse {
        cigar.iter().rev().collect()
    } else {
        cigar.iter().collect()
    };

    let mut offset = 0u32;
    let mut iter = ops.into_iter().peekable();

    if let Some(Cigar::SoftClip(len)) = iter.peek() {
        offset = *len;
        iter.next();
    }

    for op in iter {
        match op {
            Cigar::RefSkip(_) | Cigar::SoftClip(_) => return offset,
            Cigar::Match(len) | Cigar::Del(len) | Cigar::Equal(len) | Cigar::Diff(len) => {
                offset += len;
            }
            Cigar::Ins(_) | Cigar::HardClip(_) | Cigar::Pad(_) => continue,
        }
    }
    0
}
