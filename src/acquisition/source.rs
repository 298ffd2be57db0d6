//! Line source abstraction for telemetry ingestion.
//!
//! Provides a unified blocking trait for pulling newline-terminated byte
//! lines from different transports: the serial device (live rig), stdin
//! (simulator pipe) and recorded files (replay).

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;
use std::time::Duration;

use super::ReaderError;

/// Outcome of a single [`LineSource::read_line`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRead {
    /// A full line (or the final unterminated line before EOF) is in the buffer.
    Line,
    /// The read timed out. Any partial bytes stay in the buffer.
    Timeout,
    /// The source is exhausted.
    Eof,
}

/// Trait abstracting where telemetry lines come from.
///
/// `read_line` appends to `buf`; the caller clears it after consuming a
/// [`LineRead::Line`]. Returns `Err` only for unrecoverable I/O failures.
pub trait LineSource: Send + 'static {
    fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<LineRead, ReaderError>;

    /// Human-readable name for logging (e.g. "serial", "stdin", "replay").
    fn source_name(&self) -> &str;
}

// ============================================================================
// Generic BufRead Source
// ============================================================================

/// Reads lines from any buffered reader.
pub struct BufReadSource<R> {
    reader: R,
    name: String,
}

impl<R: BufRead + Send + 'static> BufReadSource<R> {
    pub fn new(reader: R, name: &str) -> Self {
        Self {
            reader,
            name: name.to_string(),
        }
    }
}

impl BufReadSource<BufReader<std::io::Stdin>> {
    /// Telemetry piped in on stdin, e.g. from `posture-sim`.
    pub fn stdin() -> Self {
        Self::new(BufReader::new(std::io::stdin()), "stdin")
    }
}

impl<R: BufRead + Send + 'static> LineSource for BufReadSource<R> {
    fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<LineRead, ReaderError> {
        match self.reader.read_until(b'\n', buf) {
            // A partial line left over from an earlier timeout is still a line
            Ok(0) if !buf.is_empty() => Ok(LineRead::Line),
            Ok(0) => Ok(LineRead::Eof),
            Ok(_) => Ok(LineRead::Line),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                Ok(LineRead::Timeout)
            }
            Err(e) => Err(ReaderError::Io(e)),
        }
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Serial Source
// ============================================================================

/// Reads lines from the rig's serial device.
///
/// `serialport` surfaces its read timeout as `ErrorKind::TimedOut`, which the
/// inner [`BufReadSource`] maps to [`LineRead::Timeout`].
pub struct SerialSource {
    inner: BufReadSource<BufReader<Box<dyn serialport::SerialPort>>>,
}

impl SerialSource {
    /// Open `path` at `baud_rate` with a per-read timeout.
    pub fn open(path: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self, ReaderError> {
        tracing::info!(port = %path, baud = baud_rate, "Opening serial port");

        let port = serialport::new(path, baud_rate)
            .timeout(read_timeout)
            .open()
            .map_err(|e| ReaderError::Open {
                port: path.to_string(),
                message: e.to_string(),
            })?;

        tracing::info!(port = %path, "Serial port open");
        Ok(Self {
            inner: BufReadSource::new(BufReader::new(port), "serial"),
        })
    }
}

impl LineSource for SerialSource {
    fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<LineRead, ReaderError> {
        self.inner.read_line(buf)
    }

    fn source_name(&self) -> &str {
        self.inner.source_name()
    }
}

// ============================================================================
// Replay Source
// ============================================================================

/// Replays a recorded telemetry file with a fixed delay between lines.
pub struct ReplaySource {
    inner: BufReadSource<BufReader<File>>,
    delay: Duration,
    yielded_first: bool,
}

impl ReplaySource {
    pub fn open(path: &Path, delay: Duration) -> Result<Self, ReaderError> {
        let file = File::open(path).map_err(|e| ReaderError::Open {
            port: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            inner: BufReadSource::new(BufReader::new(file), "replay"),
            delay,
            yielded_first: false,
        })
    }
}

impl LineSource for ReplaySource {
    fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<LineRead, ReaderError> {
        // No delay before the first line
        if self.yielded_first && !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let read = self.inner.read_line(buf)?;
        if read == LineRead::Line {
            self.yielded_first = true;
        }
        Ok(read)
    }

    fn source_name(&self) -> &str {
        self.inner.source_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn test_bufread_source_lines_then_eof() {
        let mut source = BufReadSource::new(Cursor::new(b"R: 1\nMB: 2".to_vec()), "test");
        let mut buf = Vec::new();

        assert_eq!(source.read_line(&mut buf).unwrap(), LineRead::Line);
        assert_eq!(buf, b"R: 1\n");
        buf.clear();

        assert_eq!(source.read_line(&mut buf).unwrap(), LineRead::Line);
        assert_eq!(buf, b"MB: 2");
        buf.clear();

        assert_eq!(source.read_line(&mut buf).unwrap(), LineRead::Eof);
    }

    /// Yields one chunk per read, reporting a timeout between chunks.
    struct ChunkedReader {
        chunks: Vec<&'static [u8]>,
        next: usize,
        timed_out: bool,
    }

    impl Read for ChunkedReader {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            if !self.timed_out && self.next > 0 && self.next < self.chunks.len() {
                self.timed_out = true;
                return Err(std::io::Error::new(ErrorKind::TimedOut, "timed out"));
            }
            let Some(chunk) = self.chunks.get(self.next) else {
                return Ok(0);
            };
            self.timed_out = false;
            self.next += 1;
            out[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn test_timeout_keeps_partial_line() {
        let reader = ChunkedReader {
            chunks: vec![b"R: 1", b"0 MB: 2\n"],
            next: 0,
            timed_out: false,
        };
        let mut source = BufReadSource::new(BufReader::new(reader), "chunked");
        let mut buf = Vec::new();

        assert_eq!(source.read_line(&mut buf).unwrap(), LineRead::Timeout);
        assert_eq!(buf, b"R: 1");

        assert_eq!(source.read_line(&mut buf).unwrap(), LineRead::Line);
        assert_eq!(buf, b"R: 10 MB: 2\n");
    }

    #[test]
    fn test_hard_io_error_is_fatal() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(ErrorKind::BrokenPipe, "device removed"))
            }
        }

        let mut source = BufReadSource::new(BufReader::new(Broken), "broken");
        let mut buf = Vec::new();
        assert!(matches!(source.read_line(&mut buf), Err(ReaderError::Io(_))));
    }

    #[test]
    fn test_replay_source_missing_file() {
        let result = ReplaySource::open(Path::new("/nonexistent/telemetry.log"), Duration::ZERO);
        assert!(matches!(result, Err(ReaderError::Open { .. })));
    }
}
