//! Line source: streams the input file one line at a time.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

use crate::error::BackfillError;

const COUNT_BUFFER_SIZE: usize = 32 * 1024;

/// Lazily reads lines from a file without holding it in memory.
///
/// Line terminators (`\n`, `\r\n`) are stripped. Bytes that are not valid
/// UTF-8 are replaced rather than failing the read; such a line will fail hex
/// decoding in the worker like any other malformed line.
pub struct LineSource {
    path: PathBuf,
    reader: BufReader<File>,
    buf: Vec<u8>,
    lines_read: u64,
}

impl LineSource {
    /// Open `path` for reading.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, BackfillError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .await
            .map_err(|source| BackfillError::FileOpen {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            reader: BufReader::new(file),
            buf: Vec::with_capacity(1024),
            lines_read: 0,
        })
    }

    /// Next line, or `None` at end of input.
    pub async fn next_line(&mut self) -> Result<Option<String>, BackfillError> {
        self.buf.clear();
        let n = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .await
            .map_err(|source| BackfillError::LineRead {
                line: self.lines_read,
                source,
            })?;
        if n == 0 {
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }

        self.lines_read += 1;
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }

    /// Lines returned so far.
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Count `\n` separators in `path` with a single streaming pass.
///
/// A final line without a trailing newline is not counted; the result only
/// sizes the progress bar.
pub async fn count_lines(path: impl AsRef<Path>) -> Result<u64, BackfillError> {
    let path = path.as_ref();
    let count_err = |source| BackfillError::LineCount {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).await.map_err(count_err)?;
    let mut buf = vec![0u8; COUNT_BUFFER_SIZE];
    let mut count = 0u64;
    loop {
        let n = file.read(&mut buf).await.map_err(count_err)?;
        if n == 0 {
            return Ok(count);
        }
        count += buf[..n].iter().filter(|b| **b == b'\n').count() as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    async fn collect(path: &Path) -> Vec<String> {
        let mut source = LineSource::open(path).await.unwrap();
        let mut lines = Vec::new();
        while let Some(line) = source.next_line().await.unwrap() {
            lines.push(line);
        }
        assert_eq!(source.lines_read(), lines.len() as u64);
        lines
    }

    #[tokio::test]
    async fn strips_terminators() {
        let file = write_temp(b"a,1\r\nb,2\nc,3");
        assert_eq!(collect(file.path()).await, vec!["a,1", "b,2", "c,3"]);
    }

    #[tokio::test]
    async fn keeps_blank_lines() {
        let file = write_temp(b"\n\nx\n");
        assert_eq!(collect(file.path()).await, vec!["", "", "x"]);
    }

    #[tokio::test]
    async fn empty_file_yields_nothing() {
        let file = write_temp(b"");
        assert!(collect(file.path()).await.is_empty());
        assert_eq!(count_lines(file.path()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let file = write_temp(b"id,\xff\xfe\n");
        let lines = collect(file.path()).await;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("id,"));
    }

    #[tokio::test]
    async fn count_spans_buffer_boundaries() {
        let line = "x".repeat(999) + "\n";
        let file = write_temp(line.repeat(100).as_bytes());
        assert_eq!(count_lines(file.path()).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn missing_file_is_open_error() {
        let err = LineSource::open("/nonexistent/vaas.csv").await.err().unwrap();
        assert!(matches!(err, BackfillError::FileOpen { .. }));
        let err = count_lines("/nonexistent/vaas.csv").await.unwrap_err();
        assert!(matches!(err, BackfillError::LineCount { .. }));
    }
}
