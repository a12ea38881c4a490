use std::collections::HashMap;
use std::path::Path;

use crate::errors::{Error, Result};

/// Sentinel returned by [`SampleIndexTable::find_indices`] when the lane itself is
/// unconfigured or carries no samples at all.
pub const UNDETERMINED_LANE: u64 = u64::MAX;

struct LaneTable {
    i7: Vec<Vec<u8>>,
    i5: Vec<Vec<u8>>,
    /// Rendered output filenames, one per sample plus a trailing `Undetermined` entry.
    output_files: Vec<String>,
}

/// Per-lane dual-index lookup table built from an Illumina sample sheet.
pub struct SampleIndexTable {
    lanes: HashMap<u32, LaneTable>,
    max_errors: u32,
}

fn hamming(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).filter(|(x, y)| x != y).count()
}

fn render_pattern(pattern: &str, sample_id: &str, sample_name: &str, lane: u32) -> String {
    pattern
        .replacen("%i", sample_id, 1)
        .replacen("%s", sample_name, 1)
        .replacen("%l", &format!("{:03}", lane), 1)
}

fn validate_pattern(pattern: &str) -> Result<()> {
    if !pattern.contains("%l") {
        return Err(Error::MissingLanePlaceholder(pattern.to_string()));
    }
    if !pattern.contains("%i") && !pattern.contains("%s") {
        return Err(Error::MissingSampleNamePlaceholder(pattern.to_string()));
    }
    Ok(())
}

struct SheetRow {
    sample_id: String,
    sample_name: String,
    i7: String,
    i5: String,
    lane: Option<u32>,
}

fn parse_sheet(path: &Path) -> Result<Vec<SheetRow>> {
    let text = std::fs::read_to_string(path)?;
    let lines: Vec<&str> = text.lines().collect();

    let data_marker = lines.iter().position(|l| l.starts_with("[Data]"));
    let header_idx = data_marker.map_or(0, |i| i + 1);
    let header_line = lines.get(header_idx).copied().unwrap_or("");

    let mut header_reader = csv::ReaderBuilder::new().has_headers(false).from_reader(header_line.as_bytes());
    let header: csv::StringRecord = header_reader.records().next().transpose()?.unwrap_or_default();

    let find_col = |name: &'static str| -> Option<usize> { header.iter().position(|c| c == name) };

    let sample_id_col = find_col("Sample_ID").ok_or(Error::MissingSampleSheetColumn("Sample_ID"))?;
    let sample_name_col = find_col("Sample_Name").ok_or(Error::MissingSampleSheetColumn("Sample_Name"))?;
    let i7_col = find_col("index").ok_or(Error::MissingSampleSheetColumn("index"))?;
    let i5_col = find_col("index2").ok_or(Error::MissingSampleSheetColumn("index2"))?;
    let lane_col = find_col("Lane");

    let body: String = lines[header_idx + 1..].join("\n");
    let mut rows = Vec::new();
    let mut body_reader = csv::ReaderBuilder::new().has_headers(false).from_reader(body.as_bytes());
    for record in body_reader.records() {
        let record = record?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let lane = lane_col.and_then(|c| record.get(c)).and_then(|s| s.trim().parse::<u32>().ok());
        rows.push(SheetRow {
            sample_id: record.get(sample_id_col).unwrap_or_default().to_string(),
            sample_name: record.get(sample_name_col).unwrap_or_default().to_string(),
            i7: record.get(i7_col).unwrap_or_default().to_string(),
            i5: record.get(i5_col).unwrap_or_default().to_string(),
            lane,
        });
    }
    Ok(rows)
}

impl SampleIndexTable {
    /// Parses `sample_sheet`, builds per-lane index tables, renders output filenames from
    /// `output_pattern`, and validates length uniformity and index ambiguity within each
    /// lane. `lane_override` restricts (or, for sheet rows lacking a `Lane` column,
    /// supplies) the recognized lanes.
    pub fn load(sample_sheet: &Path, output_pattern: &str, max_errors: u32, lane_override: &[u32]) -> Result<Self> {
        validate_pattern(output_pattern)?;
        let rows = parse_sheet(sample_sheet)?;

        let mut lanes: HashMap<u32, LaneTable> = HashMap::new();
        for row in &rows {
            let target_lanes: Vec<u32> = match row.lane {
                Some(lane) => {
                    if !lane_override.is_empty() && !lane_override.contains(&lane) {
                        continue;
                    }
                    vec![lane]
                }
                None => {
                    if lane_override.is_empty() {
                        vec![1]
                    } else {
                        lane_override.to_vec()
                    }
                }
            };

            for lane in target_lanes {
                let table = lanes.entry(lane).or_insert_with(|| LaneTable { i7: Vec::new(), i5: Vec::new(), output_files: Vec::new() });
                table.i7.push(row.i7.as_bytes().to_vec());
                table.i5.push(row.i5.as_bytes().to_vec());
                table.output_files.push(render_pattern(output_pattern, &row.sample_id, &row.sample_name, lane));
            }
        }

        for (&lane, table) in lanes.iter_mut() {
            table.output_files.push(render_pattern(output_pattern, "0", "Undetermined", lane));
        }

        for (&lane, table) in &lanes {
            check_uniform_length("i7", lane, &table.i7)?;
            check_uniform_length("i5", lane, &table.i5)?;
            check_ambiguity("i7", lane, &table.i7, max_errors)?;
            check_ambiguity("i5", lane, &table.i5, max_errors)?;
        }

        Ok(SampleIndexTable { lanes, max_errors })
    }

    /// Returns the 0-based sample position within `lane` for the given index pair, the
    /// lane's trailing `Undetermined` position on a lookup miss, or [`UNDETERMINED_LANE`]
    /// if the lane itself is unconfigured.
    pub fn find_indices(&self, lane: u32, i7: &[u8], i5: &[u8]) -> u64 {
        let table = match self.lanes.get(&lane) {
            Some(t) if !t.i7.is_empty() => t,
            _ => return UNDETERMINED_LANE,
        };

        let undetermined_pos = (table.output_files.len() - 1) as u64;

        let exact = table.i7.iter().position(|candidate| candidate.as_slice() == i7);
        let i7_hit = exact.or_else(|| {
            table
                .i7
                .iter()
                .enumerate()
                .map(|(idx, candidate)| (idx, hamming(candidate, i7)))
                .min_by_key(|&(_, dist)| dist)
                .filter(|&(_, dist)| dist <= self.max_errors as usize)
                .map(|(idx, _)| idx)
        });

        match i7_hit {
            Some(idx) => {
                let i5_candidate = &table.i5[idx];
                if i5_candidate.as_slice() == i5 || hamming(i5_candidate, i5) <= self.max_errors as usize {
                    idx as u64
                } else {
                    undetermined_pos
                }
            }
            None => undetermined_pos,
        }
    }

    pub fn output_filename(&self, lane: u32, pos: u64) -> Option<&str> {
        self.lanes.get(&lane).and_then(|t| t.output_files.get(pos as usize)).map(|s| s.as_str())
    }

    pub fn i7_len(&self, lane: u32) -> Option<usize> {
        self.lanes.get(&lane).and_then(|t| t.i7.first()).map(|i| i.len())
    }

    pub fn i5_len(&self, lane: u32) -> Option<usize> {
        self.lanes.get(&lane).and_then(|t| t.i5.first()).map(|i| i.len())
    }
}

fn check_uniform_length(kind: &'static str, lane: u32, indices: &[Vec<u8>]) -> Result<()> {
    if let Some(first) = indices.first() {
        if indices.iter().any(|i| i.len() != first.len()) {
            return Err(Error::UnevenIndexLength { kind, lane });
        }
    }
    Ok(())
}

fn check_ambiguity(kind: &'static str, lane: u32, indices: &[Vec<u8>], max_errors: u32) -> Result<()> {
    let allowed = 2 * max_errors as usize;
    for i in 0..indices.len() {
        for j in (i + 1)..indices.len() {
            if indices[i] != indices[j] && hamming(&indices[i], &indices[j]) <= allowed {
                return Err(Error::AmbiguousIndex {
                    kind,
                    lane,
                    a: String::from_utf8_lossy(&indices[i]).into_owned(),
                    b: String::from_utf8_lossy(&indices[j]).into_owned(),
                    distance: hamming(&indices[i], &indices[j]),
                    allowed,
                });
            }
        }
    }
    Ok(())
}
