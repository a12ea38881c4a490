use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use flate2::write::GzEncoder;
use flate2::Compression;
use log::warn;

use crate::errors::{Error, Result};
use crate::fastq::{extract_lane, open_fastq, FastqReader};
use crate::options::DemuxOptions;
use crate::router::Router;
use crate::sample_sheet::{SampleIndexTable, UNDETERMINED_LANE};

/// Per-sample output handles, created lazily on first write and shared across worker
/// threads behind a single mutex (contention is negligible: each `(lane, pos)` key is only
/// ever touched by the one worker that owns `pos % worker_count`).
struct OutputHandles {
    table: Arc<SampleIndexTable>,
    handles: Mutex<HashMap<(u32, u64), Box<dyn Write + Send>>>,
    first_error: Mutex<Option<std::io::Error>>,
}

impl OutputHandles {
    fn new(table: Arc<SampleIndexTable>) -> Self {
        OutputHandles { table, handles: Mutex::new(HashMap::new()), first_error: Mutex::new(None) }
    }

    fn write_entry(&self, lane: u32, pos: u64, bytes: &[u8]) {
        if let Err(err) = self.try_write(lane, pos, bytes) {
            let mut slot = self.first_error.lock().unwrap();
            if slot.is_none() {
                *slot = Some(err);
            }
        }
    }

    fn try_write(&self, lane: u32, pos: u64, bytes: &[u8]) -> std::io::Result<()> {
        let mut handles = self.handles.lock().unwrap();
        let key = (lane, pos);
        if !handles.contains_key(&key) {
            let filename = self.table.output_filename(lane, pos).ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, format!("no output filename for lane {} position {}", lane, pos))
            })?;
            let file = File::create(filename)?;
            let writer: Box<dyn Write + Send> =
                if filename.ends_with(".gz") { Box::new(GzEncoder::new(file, Compression::default())) } else { Box::new(file) };
            handles.insert(key, writer);
        }
        handles.get_mut(&key).unwrap().write_all(bytes)
    }

    fn take_error(&self) -> Option<std::io::Error> {
        self.first_error.lock().unwrap().take()
    }
}

fn check_fastq_format(path: &std::path::Path) -> Result<()> {
    let name = path.to_string_lossy();
    if name.ends_with(".fastq.gz") || name.ends_with(".fq.gz") || name.ends_with(".fastq") || name.ends_with(".fq") {
        Ok(())
    } else {
        Err(Error::UnknownFastqFormat(name.into_owned()))
    }
}

/// Runs the dual-index FASTQ demultiplexer end to end: builds the sample-index table,
/// spawns the worker pool, and streams the input FASTQ through the router.
pub fn run_demultiplex(opts: &DemuxOptions) -> Result<()> {
    check_fastq_format(&opts.input)?;

    let table = Arc::new(SampleIndexTable::load(&opts.sample_sheet, &opts.output, opts.max_errors, &opts.lane)?);

    let handles = Arc::new(OutputHandles::new(Arc::clone(&table)));
    let handles_for_worker = Arc::clone(&handles);
    let router = Router::spawn(opts.threads.max(1) as usize, move |lane, pos, bytes| {
        handles_for_worker.write_entry(lane, pos, bytes);
    });

    let mut reader = FastqReader::new(open_fastq(&opts.input)?);
    let skipped = AtomicU64::new(0);
    let mut total = 0u64;

    while let Some(mut record) = reader.next_record()? {
        total += 1;
        let lane = extract_lane(&record.header)?;

        let i7_len = match table.i7_len(lane) {
            Some(len) => len,
            None => {
                skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };
        let i5_len = table.i5_len(lane).unwrap_or(0);

        let i7_start = match record.header.rfind(':') {
            Some(idx) => idx + 1,
            None => continue,
        };
        if record.header.len() < i7_start + i7_len || record.header.len() < i5_len {
            continue;
        }
        let i7 = record.header[i7_start..i7_start + i7_len].as_bytes().to_vec();
        let i5_start = record.header.len() - i5_len;
        let i5 = record.header[i5_start..].as_bytes().to_vec();

        if opts.format_umi {
            let umi_start = i7_start + i7_len;
            if i5_start > umi_start {
                let umi = record.header[umi_start..i5_start - 1].to_string();
                if opts.tag_umi {
                    record.header.push_str(&format!(":FUMI|{}|", umi));
                } else {
                    record.header.push('_');
                    record.header.push_str(&umi);
                }
            }
        }

        let pos = table.find_indices(lane, &i7, &i5);
        if pos == UNDETERMINED_LANE {
            skipped.fetch_add(1, Ordering::Relaxed);
            continue;
        }

        router.enqueue(lane, pos, record.serialize());
    }

    router.finish();

    if let Some(err) = handles.take_error() {
        return Err(Error::Io(err));
    }

    let skipped = skipped.load(Ordering::Relaxed);
    if skipped > 0 {
        warn!("demultiplex: skipped {} of {} records (unconfigured lane or no index match)", skipped, total);
    }

    Ok(())
}
