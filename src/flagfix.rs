use log::info;
use rust_htslib::bam::record::Aux;
use rust_htslib::bam::{self, Read, Record};

use crate::errors::Result;
use crate::options::FixFlagsOptions;

/// Overwrites (or creates) an integer aux tag, replacing any existing value.
fn set_aux_i32(record: &mut Record, tag: &[u8], value: i32) {
    let _ = record.remove_aux(tag);
    let _ = record.push_aux(tag, Aux::I32(value));
}

fn aux_i32(record: &Record, tag: &[u8]) -> Option<i32> {
    match record.aux(tag) {
        Ok(Aux::I8(n)) => Some(n as i32),
        Ok(Aux::U8(n)) => Some(n as i32),
        Ok(Aux::I16(n)) => Some(n as i32),
        Ok(Aux::U16(n)) => Some(n as i32),
        Ok(Aux::I32(n)) => Some(n),
        Ok(Aux::U32(n)) => Some(n as i32),
        _ => None,
    }
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum Role {
    Read1,
    Read2,
    Other,
}

fn role_of(record: &Record) -> Role {
    if record.is_first_in_template() {
        Role::Read1
    } else if record.is_last_in_template() {
        Role::Read2
    } else {
        Role::Other
    }
}

/// Sort key used to order a qname group before primary/secondary assignment: role
/// (read-1, then read-2, then unpaired), then reference, then the read-1-relative
/// position (a read-2's own mate points back at its read-1), then signed template length,
/// then `HI`.
fn group_sort_key(record: &Record) -> (u8, i32, i64, i64, i64) {
    let role = role_of(record);
    let role_rank = match role {
        Role::Read1 => 0,
        Role::Read2 => 1,
        Role::Other => 2,
    };
    let pos_of_read1 = match role {
        Role::Read2 => record.mpos(),
        _ => record.pos(),
    };
    let hi = crate::identity::hi_tag(record);
    (role_rank, record.tid(), pos_of_read1, record.insert_size(), hi)
}

/// Identifies the other record of `record`'s own pair within the group, by (tid, pos,
/// isize, HI) symmetry.
fn mate_identity(record: &Record) -> (i32, i64, i64, i64) {
    (record.mtid(), record.mpos(), -record.insert_size(), crate::identity::hi_tag(record))
}

fn own_identity(record: &Record) -> (i32, i64, i64, i64) {
    (record.tid(), record.pos(), record.insert_size(), crate::identity::hi_tag(record))
}

/// Repairs primary/secondary flags and `NH`/`HI`/`XS` tags within one read-name group, and
/// returns the group ready for the final positional sort.
///
/// Grounded in the original tool's simpler `fix_and_output_read_flags` (best-MAPQ wins
/// primary, the rest become secondary, `NH`/`HI` updated), elaborated to track read-1 and
/// read-2 roles independently and to pair them by identity before choosing primaries.
pub fn fix_group(mut records: Vec<Record>) -> Vec<Record> {
    records.sort_by_key(group_sort_key);

    let read1_indices: Vec<usize> = records.iter().enumerate().filter(|(_, r)| role_of(r) == Role::Read1).map(|(i, _)| i).collect();
    let read2_indices: Vec<usize> = records.iter().enumerate().filter(|(_, r)| role_of(r) == Role::Read2).map(|(i, _)| i).collect();
    let other_indices: Vec<usize> = records.iter().enumerate().filter(|(_, r)| role_of(r) == Role::Other).map(|(i, _)| i).collect();

    let best_read1 = best_mapq_index(&records, &read1_indices);
    let best_read2 = best_mapq_index(&records, &read2_indices);
    let best_other = best_mapq_index(&records, &other_indices);

    let mut primary = vec![false; records.len()];
    if let Some(i) = best_read1 {
        primary[i] = true;
        if let Some(j) = find_mate(&records, i, &read2_indices) {
            primary[j] = true;
        } else if let Some(j) = best_read2 {
            primary[j] = true;
        }
    } else if let Some(j) = best_read2 {
        primary[j] = true;
    } else if let Some(i) = best_other {
        primary[i] = true;
    }

    let total_alignments = records.len() as i32;
    let xs_read1 = second_best_as(&records, &read1_indices);
    let xs_read2 = second_best_as(&records, &read2_indices);
    let xs_other = second_best_as(&records, &other_indices);

    for (role_indices, xs) in [(&read1_indices, xs_read1), (&read2_indices, xs_read2), (&other_indices, xs_other)] {
        for (hi, &idx) in role_indices.iter().enumerate() {
            let record = &mut records[idx];
            if primary[idx] {
                record.unset_secondary();
            } else {
                record.set_secondary();
            }
            set_aux_i32(record, b"NH", total_alignments);
            set_aux_i32(record, b"HI", (hi + 1) as i32);
            if let Some(xs) = xs {
                set_aux_i32(record, b"XS", xs);
            }
        }
    }

    records
}

fn best_mapq_index(records: &[Record], indices: &[usize]) -> Option<usize> {
    indices.iter().copied().max_by_key(|&i| records[i].mapq())
}

fn second_best_as(records: &[Record], indices: &[usize]) -> Option<i32> {
    let mut scores: Vec<i32> = indices.iter().filter_map(|&i| aux_i32(&records[i], b"AS")).collect();
    scores.sort_unstable_by(|a, b| b.cmp(a));
    scores.get(1).copied()
}

fn find_mate(records: &[Record], read1_index: usize, read2_indices: &[usize]) -> Option<usize> {
    let target = own_identity(&records[read1_index]);
    read2_indices.iter().copied().find(|&j| mate_identity(&records[j]) == target)
}

/// Key for the final output sort, matching the `sort_adjacent_pairs` vs. default modes. The
/// default mode sorts by the R1/R2 flag byte alone; `sort_by_key`'s stability otherwise
/// preserves input order.
pub fn final_sort_key(record: &Record, sort_adjacent_pairs: bool) -> (i32, i64, i64, i32) {
    if sort_adjacent_pairs {
        let lo = record.pos().min(record.mpos());
        let hi = record.pos().max(record.mpos());
        let pattern = if record.is_first_in_template() {
            record.is_reverse() as i32
        } else {
            !record.is_reverse() as i32
        };
        (record.tid(), lo, hi, pattern)
    } else {
        (0, 0, 0, (record.flags() & 0xc0) as i32)
    }
}

/// Picks the htslib format for a path, mirroring [`crate::dedup`]'s rule.
fn format_for_path(path: &std::path::Path) -> Result<bam::Format> {
    if path == std::path::Path::new("-") {
        return Ok(bam::Format::Sam);
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("bam") => Ok(bam::Format::Bam),
        Some("sam") => Ok(bam::Format::Sam),
        _ => Err(crate::errors::Error::UnknownAlignmentFormat(path.display().to_string())),
    }
}

/// Runs the flag-repair pass end to end: buckets records by qname in arrival order,
/// flushing a bucket's group to output as soon as a new qname is seen, then applies the
/// final positional sort before writing.
pub fn run_fix_flags(opts: &FixFlagsOptions) -> Result<()> {
    let mut reader = bam::Reader::from_path(&opts.input)?;
    if opts.input_threads > 1 {
        reader.set_threads(opts.input_threads as usize)?;
    }

    let header = bam::Header::from_template(reader.header());
    let mut writer = bam::Writer::from_path(&opts.output, &header, format_for_path(&opts.output)?)?;
    if opts.output_threads > 1 {
        writer.set_threads(opts.output_threads as usize)?;
    }

    let mut current_qname: Option<Vec<u8>> = None;
    let mut current_group: Vec<Record> = Vec::new();
    let mut groups_written = 0u64;

    let mut flush = |group: Vec<Record>, writer: &mut bam::Writer| -> Result<()> {
        if group.is_empty() {
            return Ok(());
        }
        let mut fixed = fix_group(group);
        fixed.sort_by_key(|r| final_sort_key(r, opts.sort_adjacent_pairs));
        for out in fixed {
            writer.write(&out)?;
        }
        Ok(())
    };

    let mut record = Record::new();
    while let Some(result) = reader.read(&mut record) {
        result?;
        if record.is_unmapped() {
            continue;
        }
        let qname = record.qname().to_vec();
        if current_qname.as_ref() != Some(&qname) {
            flush(std::mem::take(&mut current_group), &mut writer)?;
            if current_qname.is_some() {
                groups_written += 1;
            }
            current_qname = Some(qname);
        }
        current_group.push(record.clone());
    }
    flush(current_group, &mut writer)?;
    if current_qname.is_some() {
        groups_written += 1;
    }

    info!("fix_flags: repaired flags for {} read-name groups", groups_written);
    Ok(())
}
