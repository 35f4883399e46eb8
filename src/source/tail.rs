//! Tailing reader for append-only files.
//!
//! The producer appends rows while we read. We only ever hand out bytes up
//! to the last newline we have seen; a trailing partial row stays unread and
//! is picked up in full on a later poll.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::LineSource;
use crate::error::EngineError;

/// Bytes read per poll before stopping at the last newline.
pub const READ_CHUNK: u64 = 1 << 20;

/// Follows a growing file from a byte offset that only moves forward.
///
/// The first non-blank complete line of the file is its header; it is
/// consumed and kept aside rather than returned as data.
#[derive(Debug)]
pub struct TailReader {
    path: PathBuf,
    description: String,
    file: File,
    /// Start of the first byte not yet handed out.
    offset: u64,
    header: Option<String>,
    chunk: u64,
}

impl TailReader {
    /// Open `path` and consume its header row if it is already complete.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| EngineError::from_io(&path, e))?;
        let description = format!("file: {}", path.display());

        let mut reader = Self {
            path,
            description,
            file,
            offset: 0,
            header: None,
            chunk: READ_CHUNK,
        };
        reader.read_header()?;
        Ok(reader)
    }

    /// Cap the bytes read by one poll. A backlog larger than this is handed
    /// out over several polls; a single row longer than it is still returned
    /// whole.
    pub fn with_chunk_size(mut self, bytes: u64) -> Self {
        self.chunk = bytes.max(1);
        self
    }

    /// Returns the path being tailed.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of the next unread row.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn io_err(&self, e: std::io::Error) -> EngineError {
        EngineError::from_io(&self.path, e)
    }

    fn read_header(&mut self) -> Result<(), EngineError> {
        self.file.seek(SeekFrom::Start(0)).map_err(|e| self.io_err(e))?;
        let mut reader = BufReader::new(&self.file);
        let mut line = Vec::new();
        loop {
            line.clear();
            let n = reader.read_until(b'\n', &mut line).map_err(|e| self.io_err(e))?;
            if line.last() != Some(&b'\n') {
                break;
            }
            // Leading blank lines are stepped over, never taken as the header.
            self.offset += n as u64;
            let text = decode(&line);
            if !is_blank(&text) {
                self.header = Some(text);
                debug!(path = %self.path.display(), header = ?self.header, "consumed header");
                break;
            }
        }
        Ok(())
    }

    /// Read complete lines past the cursor, up to roughly one chunk, and
    /// advance over them.
    fn read_complete(&mut self) -> Result<Vec<String>, EngineError> {
        let size = fs::metadata(&self.path).map_err(|e| self.io_err(e))?.len();
        if size < self.offset {
            return Err(EngineError::StreamReset {
                path: self.path.clone(),
                offset: self.offset,
                size,
            });
        }
        if size == self.offset {
            return Ok(Vec::new());
        }

        self.file.seek(SeekFrom::Start(self.offset)).map_err(|e| self.io_err(e))?;
        let available = size - self.offset;
        let mut reader = (&self.file).take(available);
        let mut buf = Vec::with_capacity(available.min(self.chunk) as usize);
        loop {
            let start = buf.len();
            let n = reader
                .by_ref()
                .take(self.chunk)
                .read_to_end(&mut buf)
                .map_err(|e| self.io_err(e))?;
            // Keep reading only while the chunk holds no row boundary.
            if n == 0 || buf[start..].contains(&b'\n') {
                break;
            }
        }

        let Some(last_newline) = buf.iter().rposition(|&b| b == b'\n') else {
            return Ok(Vec::new());
        };
        self.offset += last_newline as u64 + 1;

        Ok(buf[..last_newline]
            .split(|&b| b == b'\n')
            .map(decode)
            .filter(|line| !is_blank(line))
            .collect())
    }
}

impl LineSource for TailReader {
    fn poll_lines(&mut self) -> Result<Vec<String>, EngineError> {
        let mut lines = self.read_complete()?;
        if self.header.is_none() && !lines.is_empty() {
            self.header = Some(lines.remove(0));
            debug!(path = %self.path.display(), header = ?self.header, "consumed late header");
        }
        Ok(lines)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Decode one line, dropping the line terminator. Invalid UTF-8 is replaced
/// rather than rejected so the parser can report the row as malformed.
fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "timestamp,open,high,low,close,volume,ts_recv";

    fn append(path: &Path, text: &str) {
        let mut f = OpenOptions::new().append(true).open(path).unwrap();
        f.write_all(text.as_bytes()).unwrap();
        f.flush().unwrap();
    }

    fn with_header() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        file
    }

    #[test]
    fn test_open_missing_file() {
        let err = TailReader::open("/nonexistent/path/SPY.csv").unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn test_header_is_consumed() {
        let file = with_header();
        let mut reader = TailReader::open(file.path()).unwrap();
        assert_eq!(reader.header(), Some(HEADER));
        assert_eq!(reader.offset(), HEADER.len() as u64 + 1);
        assert!(reader.poll_lines().unwrap().is_empty());
        assert_eq!(reader.description(), format!("file: {}", file.path().display()));
    }

    #[test]
    fn test_existing_rows_are_read_on_first_poll() {
        let file = with_header();
        append(file.path(), "1,a,b,c,d,e,6\n2,a,b,c,d,e,7\n");

        let mut reader = TailReader::open(file.path()).unwrap();
        assert_eq!(reader.poll_lines().unwrap(), vec!["1,a,b,c,d,e,6", "2,a,b,c,d,e,7"]);
        assert!(reader.poll_lines().unwrap().is_empty());
    }

    #[test]
    fn test_partial_line_is_held_back() {
        let file = with_header();
        let mut reader = TailReader::open(file.path()).unwrap();
        let start = reader.offset();

        append(file.path(), "10,1,1,1,1,1,1");
        assert!(reader.poll_lines().unwrap().is_empty());
        assert_eq!(reader.offset(), start);

        append(file.path(), "5\n20,1,1,1");
        assert_eq!(reader.poll_lines().unwrap(), vec!["10,1,1,1,1,1,15"]);

        append(file.path(), ",1,1,25\n");
        assert_eq!(reader.poll_lines().unwrap(), vec!["20,1,1,1,1,1,25"]);
    }

    #[test]
    fn test_late_header() {
        let file = NamedTempFile::new().unwrap();
        let mut reader = TailReader::open(file.path()).unwrap();
        assert_eq!(reader.header(), None);

        append(file.path(), "timestamp,ts_");
        assert!(reader.poll_lines().unwrap().is_empty());
        assert_eq!(reader.header(), None);

        append(file.path(), "recv\n1,2\n");
        assert_eq!(reader.poll_lines().unwrap(), vec!["1,2"]);
        assert_eq!(reader.header(), Some("timestamp,ts_recv"));
    }

    #[test]
    fn test_leading_blank_lines_are_not_the_header() {
        let file = NamedTempFile::new().unwrap();
        append(file.path(), &format!("\n  \r\n{}\n1,2\n", HEADER));

        let mut reader = TailReader::open(file.path()).unwrap();
        assert_eq!(reader.header(), Some(HEADER));
        assert_eq!(reader.poll_lines().unwrap(), vec!["1,2"]);
    }

    #[test]
    fn test_late_header_after_blank_lines() {
        let file = NamedTempFile::new().unwrap();
        append(file.path(), "\n");
        let mut reader = TailReader::open(file.path()).unwrap();
        assert_eq!(reader.header(), None);
        assert_eq!(reader.offset(), 1);

        append(file.path(), &format!("\n{}\n3,4\n", HEADER));
        assert_eq!(reader.poll_lines().unwrap(), vec!["3,4"]);
        assert_eq!(reader.header(), Some(HEADER));
    }

    #[test]
    fn test_backlog_is_read_in_chunks() {
        let file = with_header();
        let rows: Vec<String> = (0..6).map(|i| format!("{},1,1,1,1,1,{}", i, i + 5)).collect();
        append(file.path(), &format!("{}\n", rows.join("\n")));

        let mut reader = TailReader::open(file.path()).unwrap().with_chunk_size(20);
        let mut seen = Vec::new();
        let mut polls = 0;
        loop {
            let lines = reader.poll_lines().unwrap();
            if lines.is_empty() {
                break;
            }
            assert!(lines.len() < rows.len());
            seen.extend(lines);
            polls += 1;
        }
        assert!(polls > 1);
        assert_eq!(seen, rows);
    }

    #[test]
    fn test_row_longer_than_chunk_is_returned_whole() {
        let file = with_header();
        let long = format!("1,{},1,1,1,1,6", "9".repeat(64));
        append(file.path(), &format!("{}\n2,1,1,1,1,1,7\n", long));

        let mut reader = TailReader::open(file.path()).unwrap().with_chunk_size(8);
        assert_eq!(reader.poll_lines().unwrap(), vec![long]);
        assert_eq!(reader.poll_lines().unwrap(), vec!["2,1,1,1,1,1,7"]);
        assert!(reader.poll_lines().unwrap().is_empty());
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let file = with_header();
        append(file.path(), "1,2\r\n\r\n\n3,4\r\n");
        let mut reader = TailReader::open(file.path()).unwrap();
        assert_eq!(reader.poll_lines().unwrap(), vec!["1,2", "3,4"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let file = with_header();
        {
            let mut f = OpenOptions::new().append(true).open(file.path()).unwrap();
            f.write_all(b"1,\xff\n").unwrap();
        }
        let mut reader = TailReader::open(file.path()).unwrap();
        let lines = reader.poll_lines().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains('\u{FFFD}'));
    }

    #[test]
    fn test_truncation_is_stream_reset() {
        let file = with_header();
        append(file.path(), "1,2\n3,4\n");
        let mut reader = TailReader::open(file.path()).unwrap();
        reader.poll_lines().unwrap();

        file.as_file().set_len(5).unwrap();
        let err = reader.poll_lines().unwrap_err();
        assert!(matches!(err, EngineError::StreamReset { size: 5, .. }));
    }
}
