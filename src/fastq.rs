use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::errors::{Error, Result};

/// A single 4-line FASTQ record.
pub struct FastqRecord {
    pub header: String,
    pub seq: String,
    pub desc: String,
    pub qual: String,
}

impl FastqRecord {
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.header.len() + self.seq.len() + self.desc.len() + self.qual.len() + 4);
        buf.extend_from_slice(self.header.as_bytes());
        buf.push(b'\n');
        buf.extend_from_slice(self.seq.as_bytes());
        buf.push(b'\n');
        buf.extend_from_slice(self.desc.as_bytes());
        buf.push(b'\n');
        buf.extend_from_slice(self.qual.as_bytes());
        buf.push(b'\n');
        buf
    }
}

/// Opens a FASTQ file, transparently gzip-decoding when the extension is `.gz`, behind a
/// `Box<dyn BufRead>` so callers don't need to know which decoder is in play.
pub fn open_fastq(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let is_gz = path.extension().and_then(|e| e.to_str()) == Some("gz");
    if is_gz {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Pulls 4-line FASTQ records off `reader`, one at a time.
pub struct FastqReader<R: BufRead> {
    reader: R,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        FastqReader { reader }
    }

    pub fn next_record(&mut self) -> Result<Option<FastqRecord>> {
        let mut header = String::new();
        if self.reader.read_line(&mut header)? == 0 {
            return Ok(None);
        }
        let mut seq = String::new();
        let mut desc = String::new();
        let mut qual = String::new();
        self.reader.read_line(&mut seq)?;
        self.reader.read_line(&mut desc)?;
        self.reader.read_line(&mut qual)?;

        Ok(Some(FastqRecord {
            header: trim_newline(header),
            seq: trim_newline(seq),
            desc: trim_newline(desc),
            qual: trim_newline(qual),
        }))
    }
}

fn trim_newline(mut s: String) -> String {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
    s
}

/// Extracts the 1-based lane from a FASTQ header's fourth colon-delimited field.
pub fn extract_lane(header: &str) -> Result<u32> {
    let field = header.splitn(5, ':').nth(3).unwrap_or("");
    match field.parse::<u32>() {
        Ok(0) | Err(_) => Err(Error::LaneNotFound { header: header.to_string() }),
        Ok(lane) => Ok(lane),
    }
}
