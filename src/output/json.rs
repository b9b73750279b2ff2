//! Streaming JSON writer.
//!
//! The writer emits a document incrementally as
//! `document → section → optional subsection → key/value`, straight into an
//! [`OutputSink`]. Nothing but a handful of flags and counters is kept in
//! memory, so a document can be arbitrarily large.
//!
//! Every operation validates the current state first and fails with a typed
//! [`JsonError`] instead of producing malformed output.
//!
//! ```
//! use statstream::output::{JsonWriter, OutputSink};
//!
//! let mut writer = JsonWriter::new(OutputSink::new(Vec::new()));
//! writer.open_document().unwrap();
//! writer.open_section("stat").unwrap();
//! writer.write_int("btime", 12345).unwrap();
//! writer.close_section().unwrap();
//! writer.close_document().unwrap();
//!
//! let out = writer.into_sink().into_inner().unwrap();
//! let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
//! assert_eq!(value["stat"]["btime"], 12345);
//! ```

use std::io::{self, Write};

use super::sink::OutputSink;

const INDENT: &str = "    ";

/// Structural or I/O failure of the JSON writer.
///
/// Everything except `Io` is a caller-discipline bug: the current document
/// must be abandoned with [`JsonWriter::abort_document`].
#[derive(Debug)]
pub enum JsonError {
    /// `open_document` called while a document is open.
    AlreadyOpen,
    /// Operation needs an open document.
    NoOpenDocument,
    /// `open_section` called while another section is open.
    NestedSection,
    /// Key/value written, or section closed, with no section open.
    NoOpenScope,
    /// Subsection opened twice, opened outside a section, or closed when none is open.
    SubsectionState,
    /// `close_section` called while a subsection is still open.
    UnclosedSubsection,
    /// `close_document` called while a section is still open.
    UnclosedSection,
    /// Writing to the sink failed.
    Io(io::Error),
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonError::AlreadyOpen => write!(f, "document is already open"),
            JsonError::NoOpenDocument => write!(f, "no document is open"),
            JsonError::NestedSection => write!(f, "section opened inside another section"),
            JsonError::NoOpenScope => write!(f, "no section is open"),
            JsonError::SubsectionState => write!(f, "invalid subsection open/close"),
            JsonError::UnclosedSubsection => {
                write!(f, "section closed while a subsection is open")
            }
            JsonError::UnclosedSection => write!(f, "document closed while a section is open"),
            JsonError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for JsonError {}

impl From<io::Error> for JsonError {
    fn from(e: io::Error) -> Self {
        JsonError::Io(e)
    }
}

/// Lifecycle of the current document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentState {
    None,
    Open,
    Closed,
}

/// One level of the structural stack.
#[derive(Debug, Clone, Copy, Default)]
struct Level {
    open: bool,
    entries: usize,
}

impl Level {
    fn opened() -> Self {
        Self {
            open: true,
            entries: 0,
        }
    }
}

/// Incremental JSON emitter.
pub struct JsonWriter<W: Write> {
    sink: OutputSink<W>,
    document: DocumentState,
    /// Document level: counts top-level entries.
    top: Level,
    section: Level,
    subsection: Level,
    /// Sink position where the current document started.
    document_start: u64,
    documents: u64,
    scratch: Vec<u8>,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(sink: OutputSink<W>) -> Self {
        Self {
            sink,
            document: DocumentState::None,
            top: Level::default(),
            section: Level::default(),
            subsection: Level::default(),
            document_start: 0,
            documents: 0,
            scratch: Vec::with_capacity(256),
        }
    }

    pub fn sink(&self) -> &OutputSink<W> {
        &self.sink
    }

    pub fn into_sink(self) -> OutputSink<W> {
        self.sink
    }

    /// Number of documents closed so far.
    pub fn documents_written(&self) -> u64 {
        self.documents
    }

    pub fn is_document_open(&self) -> bool {
        self.document == DocumentState::Open
    }

    pub fn is_section_open(&self) -> bool {
        self.section.open
    }

    pub fn is_subsection_open(&self) -> bool {
        self.subsection.open
    }

    /// Writes the opening brace of a new document.
    pub fn open_document(&mut self) -> Result<(), JsonError> {
        if self.document == DocumentState::Open {
            return Err(JsonError::AlreadyOpen);
        }
        self.document_start = self.sink.position();
        self.sink.write_all(b"{")?;
        self.document = DocumentState::Open;
        self.top = Level::opened();
        self.section = Level::default();
        self.subsection = Level::default();
        Ok(())
    }

    /// Writes `"name": {` at document level.
    pub fn open_section(&mut self, name: &str) -> Result<(), JsonError> {
        if self.document != DocumentState::Open {
            return Err(JsonError::NoOpenDocument);
        }
        if self.section.open {
            return Err(JsonError::NestedSection);
        }
        self.begin_entry(name)?;
        self.scratch.push(b'{');
        self.emit()?;
        self.section = Level::opened();
        Ok(())
    }

    /// Writes `"name": {` inside the open section.
    pub fn open_subsection(&mut self, name: &str) -> Result<(), JsonError> {
        if !self.section.open || self.subsection.open {
            return Err(JsonError::SubsectionState);
        }
        self.begin_entry(name)?;
        self.scratch.push(b'{');
        self.emit()?;
        self.subsection = Level::opened();
        Ok(())
    }

    pub fn close_subsection(&mut self) -> Result<(), JsonError> {
        if !self.subsection.open {
            return Err(JsonError::SubsectionState);
        }
        self.scratch.clear();
        self.push_close(2);
        self.emit()?;
        self.subsection = Level::default();
        Ok(())
    }

    /// Closes the open section. Never closes a subsection implicitly.
    pub fn close_section(&mut self) -> Result<(), JsonError> {
        if self.subsection.open {
            return Err(JsonError::UnclosedSubsection);
        }
        if !self.section.open {
            return Err(JsonError::NoOpenScope);
        }
        self.scratch.clear();
        self.push_close(1);
        self.emit()?;
        self.section = Level::default();
        Ok(())
    }

    /// Writes the closing brace and a newline separating the next document.
    pub fn close_document(&mut self) -> Result<(), JsonError> {
        if self.document != DocumentState::Open {
            return Err(JsonError::NoOpenDocument);
        }
        if self.section.open {
            return Err(JsonError::UnclosedSection);
        }
        self.scratch.clear();
        self.push_close(0);
        self.scratch.push(b'\n');
        self.emit()?;
        self.document = DocumentState::Closed;
        self.top = Level::default();
        self.documents += 1;
        Ok(())
    }

    pub fn write_string(&mut self, key: &str, value: &str) -> Result<(), JsonError> {
        self.check_scope()?;
        self.begin_entry(key)?;
        serde_json::to_writer(&mut self.scratch, value).map_err(io::Error::from)?;
        self.emit()
    }

    pub fn write_int(&mut self, key: &str, value: i64) -> Result<(), JsonError> {
        self.check_scope()?;
        self.begin_entry(key)?;
        write!(self.scratch, "{}", value)?;
        self.emit()
    }

    pub fn write_uint(&mut self, key: &str, value: u64) -> Result<(), JsonError> {
        self.check_scope()?;
        self.begin_entry(key)?;
        write!(self.scratch, "{}", value)?;
        self.emit()
    }

    /// Writes a float with three decimals; NaN and infinities become `null`.
    pub fn write_float(&mut self, key: &str, value: f64) -> Result<(), JsonError> {
        self.check_scope()?;
        self.begin_entry(key)?;
        if value.is_finite() {
            write!(self.scratch, "{:.3}", value)?;
        } else {
            self.scratch.extend_from_slice(b"null");
        }
        self.emit()
    }

    /// Emits pre-formatted JSON text verbatim.
    ///
    /// No validation and no state change: the caller owns the validity of
    /// the result. Drains the sink beforehand if `bytes` would not fit.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), JsonError> {
        self.sink.reserve(bytes.len())?;
        self.sink.write_all(bytes)?;
        Ok(())
    }

    /// Splices a pre-formatted JSON value under `key` in the innermost open
    /// scope (document level when no section is open).
    ///
    /// An empty or whitespace-only blob is written as `null`.
    pub fn write_raw_value(&mut self, key: &str, blob: &[u8]) -> Result<(), JsonError> {
        if self.document != DocumentState::Open {
            return Err(JsonError::NoOpenDocument);
        }
        self.begin_entry(key)?;
        self.emit()?;
        let trimmed = blob.trim_ascii();
        if trimmed.is_empty() {
            self.write_raw(b"null")
        } else {
            self.write_raw(trimmed)
        }
    }

    /// Abandons the open document after a structural error.
    ///
    /// Bytes of the document still held by the sink are discarded. Returns
    /// `true` if nothing of the document had reached the destination; `false`
    /// means a truncated fragment was already flushed, in which case a
    /// newline is written so the next document starts on a fresh line.
    pub fn abort_document(&mut self) -> Result<bool, JsonError> {
        if self.document != DocumentState::Open {
            return Ok(true);
        }
        self.document = DocumentState::Closed;
        self.top = Level::default();
        self.section = Level::default();
        self.subsection = Level::default();
        let retracted = self.sink.rewind_to(self.document_start);
        if !retracted {
            self.sink.write_all(b"\n")?;
        }
        Ok(retracted)
    }

    /// Explicit flush point, normally called once per cycle.
    pub fn flush(&mut self) -> Result<(), JsonError> {
        self.sink.flush()?;
        Ok(())
    }

    fn check_scope(&self) -> Result<(), JsonError> {
        if self.document != DocumentState::Open || !self.section.open {
            return Err(JsonError::NoOpenScope);
        }
        Ok(())
    }

    /// Innermost open level and its depth (0 = document).
    fn current_level(&mut self) -> (&mut Level, usize) {
        if self.subsection.open {
            (&mut self.subsection, 3)
        } else if self.section.open {
            (&mut self.section, 2)
        } else {
            (&mut self.top, 1)
        }
    }

    /// Prepares `scratch` with the separator, indentation and `"key": `.
    fn begin_entry(&mut self, key: &str) -> io::Result<()> {
        let (level, depth) = self.current_level();
        let first = level.entries == 0;
        level.entries += 1;

        self.scratch.clear();
        if !first {
            self.scratch.push(b',');
        }
        self.scratch.push(b'\n');
        for _ in 0..depth {
            self.scratch.extend_from_slice(INDENT.as_bytes());
        }
        serde_json::to_writer(&mut self.scratch, key).map_err(io::Error::from)?;
        self.scratch.extend_from_slice(b": ");
        Ok(())
    }

    fn push_close(&mut self, depth: usize) {
        self.scratch.push(b'\n');
        for _ in 0..depth {
            self.scratch.extend_from_slice(INDENT.as_bytes());
        }
        self.scratch.push(b'}');
    }

    fn emit(&mut self) -> Result<(), JsonError> {
        self.sink.write_all(&self.scratch)?;
        Ok(())
    }
}
