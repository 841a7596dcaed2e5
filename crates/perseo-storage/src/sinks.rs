//! A single plain-text output file paired with a `.log` header describing
//! its columns, matching the reference simulator's convention of writing a
//! human-readable header file alongside every data file it produces.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, StorageError};

/// A buffered text file plus the one-time header file describing its format.
#[derive(Debug)]
pub struct TextSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TextSink {
    /// Opens `path` for writing (truncating any existing content) and writes
    /// `header` to a sibling file named `path` with a `.log` extension
    /// appended.
    pub fn create(path: impl AsRef<Path>, header: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| StorageError::io(path.display().to_string(), e))?;

        let log_path = Self::header_path(&path);
        let mut log_file =
            File::create(&log_path).map_err(|e| StorageError::io(log_path.display().to_string(), e))?;
        log_file
            .write_all(header.as_bytes())
            .map_err(|e| StorageError::io(log_path.display().to_string(), e))?;

        Ok(TextSink { path, writer: BufWriter::new(file) })
    }

    fn header_path(path: &Path) -> PathBuf {
        let mut s = path.as_os_str().to_owned();
        s.push(".log");
        PathBuf::from(s)
    }

    /// Writes one line, appending a trailing newline.
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(|e| StorageError::io(self.path.display().to_string(), e))
    }

    /// Flushes buffered output to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| StorageError::io(self.path.display().to_string(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_data_and_header_files() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("rates.dat");
        let mut sink = TextSink::create(&data_path, "# time(ms) rate(Hz)\n").unwrap();
        sink.write_line("10.0 42.5").unwrap();
        sink.flush().unwrap();

        let data = std::fs::read_to_string(&data_path).unwrap();
        assert_eq!(data, "10.0 42.5\n");

        let header_path = dir.path().join("rates.dat.log");
        let header = std::fs::read_to_string(&header_path).unwrap();
        assert!(header.contains("rate(Hz)"));
    }

    proptest::proptest! {
        #[test]
        fn any_sequence_of_lines_round_trips_in_order(
            lines in proptest::collection::vec("[a-zA-Z0-9 .]{0,40}", 0..20)
        ) {
            let dir = tempfile::tempdir().unwrap();
            let data_path = dir.path().join("lines.dat");
            let mut sink = TextSink::create(&data_path, "# header\n").unwrap();
            for line in &lines {
                sink.write_line(line).unwrap();
            }
            sink.flush().unwrap();

            let written = std::fs::read_to_string(&data_path).unwrap();
            let read_back: Vec<&str> = written.lines().collect();
            prop_assert_eq!(read_back, lines);
        }
    }
}
