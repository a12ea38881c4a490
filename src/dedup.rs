use std::path::Path;

use log::info;
use rust_htslib::bam::{self, Read};

use crate::driver::{Driver, DriverOptions};
use crate::errors::{Error, Result};
use crate::options::DedupOptions;

/// Picks the htslib format for a path: `.bam` is binary, `-` or `.sam` is text SAM.
/// Any other extension is rejected.
fn format_for_path(path: &Path) -> Result<bam::Format> {
    if path == Path::new("-") {
        return Ok(bam::Format::Sam);
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("bam") => Ok(bam::Format::Bam),
        Some("sam") => Ok(bam::Format::Sam),
        _ => Err(Error::UnknownAlignmentFormat(path.display().to_string())),
    }
}

fn check_coordinate_sorted(header: &bam::HeaderView, path: &Path) -> Result<()> {
    let text = String::from_utf8_lossy(header.as_bytes());
    let sorted = text
        .lines()
        .find(|line| line.starts_with("@HD"))
        .map(|line| line.contains("SO:coordinate"))
        .unwrap_or(false);

    if sorted {
        Ok(())
    } else {
        Err(Error::NotCoordinateSorted { path: path.display().to_string() })
    }
}

/// Runs the position/UMI deduplication pass end to end: opens `opts.input`, validates the
/// coordinate-sort header contract, streams every record through the [`Driver`], and writes
/// survivors to `opts.output` in the same header's target order.
pub fn run_dedup(opts: &DedupOptions) -> Result<()> {
    let mut reader = bam::Reader::from_path(&opts.input)?;
    if opts.input_threads > 1 {
        reader.set_threads(opts.input_threads as usize)?;
    }

    check_coordinate_sorted(reader.header(), &opts.input)?;

    let header = bam::Header::from_template(reader.header());
    let output_format = format_for_path(&opts.output)?;

    let mut writer = bam::Writer::from_path(&opts.output, &header, output_format)?;
    if opts.uncompressed {
        writer.set_compression_level(bam::CompressionLevel::Uncompressed)?;
    }
    if opts.output_threads > 1 {
        writer.set_threads(opts.output_threads as usize)?;
    }

    let driver_opts = DriverOptions {
        soft_clip_threshold: opts.soft_clip_threshold,
        read_length: !opts.start_only,
        spliced: opts.spliced,
        paired: opts.paired,
        ignore_tlen: opts.ignore_tlen,
        chimeric_pairs: opts.chimeric_pairs,
        unpaired_reads: opts.unpaired_reads,
        seed: opts.seed,
    };
    let mut driver = Driver::new(driver_opts);

    let mut record = bam::Record::new();
    let mut input_count = 0u64;
    let mut output_count = 0u64;
    while let Some(result) = reader.read(&mut record) {
        result?;
        input_count += 1;
        for out in driver.offer(record.clone())? {
            writer.write(&out)?;
            output_count += 1;
        }
    }
    for out in driver.finish() {
        writer.write(&out)?;
        output_count += 1;
    }

    info!("dedup: read {} records, wrote {} survivors", input_count, output_count);
    Ok(())
}
