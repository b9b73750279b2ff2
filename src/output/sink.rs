//! Append-only byte destination with bounded buffering.
//!
//! `OutputSink` sits between the JSON writer and the real destination
//! (file, pipe or socket). Bytes accumulate in a fixed-capacity buffer and
//! only reach the destination on an explicit flush or when the buffer would
//! overflow, so memory use never depends on the document size.

use std::io::{self, Write};

/// Default internal buffer capacity (64 KiB).
pub const DEFAULT_CAPACITY: usize = 64 * 1024;

/// Buffered append-only writer.
///
/// Unlike `std::io::BufWriter`, the sink tracks the absolute stream position
/// so that the JSON writer can retract a partially written document as long
/// as it has not been handed to the destination yet.
#[derive(Debug)]
pub struct OutputSink<W: Write> {
    inner: W,
    buf: Vec<u8>,
    capacity: usize,
    /// Total number of bytes handed to `inner` so far.
    flushed: u64,
}

impl<W: Write> OutputSink<W> {
    /// Creates a sink with the default buffer capacity.
    pub fn new(inner: W) -> Self {
        Self::with_capacity(inner, DEFAULT_CAPACITY)
    }

    /// Creates a sink with a custom buffer capacity (at least one byte).
    pub fn with_capacity(inner: W, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner,
            buf: Vec::with_capacity(capacity),
            capacity,
            flushed: 0,
        }
    }

    /// Number of bytes waiting in the buffer.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Free space left in the buffer before a flush is forced.
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.buf.len())
    }

    /// Absolute stream position: bytes flushed plus bytes buffered.
    pub fn position(&self) -> u64 {
        self.flushed + self.buf.len() as u64
    }

    /// Bytes already handed to the destination.
    pub fn flushed_bytes(&self) -> u64 {
        self.flushed
    }

    /// Appends bytes to the stream.
    ///
    /// Drains the buffer first when `bytes` does not fit. Writes at least as
    /// large as the whole buffer bypass it entirely.
    pub fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        if bytes.len() > self.remaining() {
            self.drain()?;
        }
        if bytes.len() >= self.capacity {
            self.inner.write_all(bytes)?;
            self.flushed += bytes.len() as u64;
            return Ok(());
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Makes room for an upcoming write of `len` bytes.
    ///
    /// Returns `true` if the buffer had to be drained.
    pub fn reserve(&mut self, len: usize) -> io::Result<bool> {
        if len > self.remaining() && !self.buf.is_empty() {
            self.drain()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Drains the buffer and flushes the destination.
    pub fn flush(&mut self) -> io::Result<()> {
        self.drain()?;
        self.inner.flush()
    }

    /// Drops buffered bytes beyond the absolute `position`.
    ///
    /// Returns `false` if part of the stream after `position` had already
    /// reached the destination; in that case the whole buffer is discarded.
    pub fn rewind_to(&mut self, position: u64) -> bool {
        if position < self.flushed {
            self.buf.clear();
            return false;
        }
        let keep = (position - self.flushed) as usize;
        if keep < self.buf.len() {
            self.buf.truncate(keep);
        }
        true
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Flushes and returns the destination.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.flush()?;
        Ok(self.inner)
    }

    fn drain(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.inner.write_all(&self.buf)?;
        self.flushed += self.buf.len() as u64;
        self.buf.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_writes_stay_buffered() {
        let mut sink = OutputSink::with_capacity(Vec::new(), 16);
        sink.write_all(b"hello").unwrap();

        assert!(sink.get_ref().is_empty());
        assert_eq!(sink.buffered(), 5);
        assert_eq!(sink.remaining(), 11);
        assert_eq!(sink.position(), 5);
    }

    #[test]
    fn test_overflow_drains_buffer_first() {
        let mut sink = OutputSink::with_capacity(Vec::new(), 8);
        sink.write_all(b"abcde").unwrap();
        sink.write_all(b"fghij").unwrap();

        assert_eq!(sink.get_ref().as_slice(), b"abcde");
        assert_eq!(sink.buffered(), 5);
        assert_eq!(sink.flushed_bytes(), 5);
    }

    #[test]
    fn test_large_write_bypasses_buffer() {
        let mut sink = OutputSink::with_capacity(Vec::new(), 4);
        sink.write_all(b"ab").unwrap();
        sink.write_all(b"0123456789").unwrap();

        assert_eq!(sink.get_ref().as_slice(), b"ab0123456789");
        assert_eq!(sink.buffered(), 0);
        assert_eq!(sink.position(), 12);
    }

    #[test]
    fn test_reserve_flushes_when_near_capacity() {
        let mut sink = OutputSink::with_capacity(Vec::new(), 10);
        sink.write_all(b"12345678").unwrap();

        assert!(!sink.reserve(2).unwrap());
        assert!(sink.reserve(3).unwrap());
        assert_eq!(sink.get_ref().as_slice(), b"12345678");
        assert_eq!(sink.remaining(), 10);
    }

    #[test]
    fn test_rewind_within_buffer() {
        let mut sink = OutputSink::with_capacity(Vec::new(), 64);
        sink.write_all(b"keep").unwrap();
        let mark = sink.position();
        sink.write_all(b"drop me").unwrap();

        assert!(sink.rewind_to(mark));
        let out = sink.into_inner().unwrap();
        assert_eq!(out.as_slice(), b"keep");
    }

    #[test]
    fn test_rewind_after_flush_reports_partial() {
        let mut sink = OutputSink::with_capacity(Vec::new(), 64);
        let mark = sink.position();
        sink.write_all(b"partial").unwrap();
        sink.flush().unwrap();
        sink.write_all(b"tail").unwrap();

        assert!(!sink.rewind_to(mark));
        assert_eq!(sink.buffered(), 0);
        assert_eq!(sink.get_ref().as_slice(), b"partial");
    }

    #[test]
    fn test_file_backed_sink() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let handle = file.reopen().unwrap();
        let mut sink = OutputSink::with_capacity(handle, 32);
        sink.write_all(b"{\"a\": 1}\n").unwrap();
        sink.flush().unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(content, "{\"a\": 1}\n");
    }
}
