use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Dead-letter destination for messages no template recognised.
pub trait UnprocessedSink {
    fn append(&mut self, timestamp: &str, text: &str) -> Result<()>;
}

/// One log line per entry. Line breaks inside the message are written as `\n`
/// and `\r` escapes so the file stays line-per-message.
pub fn format_entry(timestamp: &str, text: &str) -> String {
    let text = text.replace('\r', "\\r").replace('\n', "\\n");
    format!("TIMESTAMP: {timestamp} | MESSAGE: {text}")
}

// ---------------------------------------------------------------------------
// File-backed log
// ---------------------------------------------------------------------------

pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
    written: usize,
}

impl FileSink {
    /// Start an empty log, discarding whatever a previous run left behind.
    pub fn fresh(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_file(path, file))
    }

    /// Keep existing entries and add to the end.
    #[allow(dead_code)]
    pub fn append_to(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::from_file(path, file))
    }

    fn from_file(path: &Path, file: File) -> Self {
        Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries written through this handle.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl UnprocessedSink for FileSink {
    fn append(&mut self, timestamp: &str, text: &str) -> Result<()> {
        writeln!(self.writer, "{}", format_entry(timestamp, text))?;
        self.written += 1;
        Ok(())
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Number of lines in a dead-letter log; a missing file counts as empty.
pub fn count_entries(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Ok(0);
    }
    let reader = BufReader::new(File::open(path)?);
    let mut count = 0usize;
    for line in reader.lines() {
        line?;
        count += 1;
    }
    Ok(count)
}

// ---------------------------------------------------------------------------
// In-memory log
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemorySink {
    pub entries: Vec<(String, String)>,
}

#[allow(dead_code)]
impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl UnprocessedSink for MemorySink {
    fn append(&mut self, timestamp: &str, text: &str) -> Result<()> {
        self.entries.push((timestamp.to_string(), text.to_string()));
        Ok(())
    }
}
