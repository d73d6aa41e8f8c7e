// Streaming source map writer.
//
// StreamWriter emits the JSON envelope incrementally:
//   - header (version, file, sources, optional names) on construction
//   - per source: next_source() then its lines, escaped straight to the sink
//   - per generated line: write_generated_line(), encoded into a spool
//   - finish(): close sourcesContent, copy the escaped spool as `mappings`
//
// Source text never accumulates in memory. The mapping body has to come
// after sourcesContent in the output, so it is spooled; any Read + Write +
// Seek spool works (an anonymous temp file keeps memory bounded).

use std::io::{self, BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};

use log::debug;

use super::escape::{self, CharSink, Utf8Reader, WriteSink};
use crate::mappings::encoder::MappingsEncoder;
use crate::mappings::{NameMode, Segment};

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Envelope fields known before any content is written.
#[derive(Debug, Clone, Default)]
pub struct StreamHeader {
    /// Generated file name.
    pub file: String,
    /// Source names, in the order their content will be written.
    pub sources: Vec<String>,
    /// Identifier names; non-empty enables the fifth segment field.
    pub names: Vec<String>,
}

impl StreamHeader {
    pub fn new(file: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            file: file.into(),
            sources,
            names: Vec::new(),
        }
    }

    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = names;
        self
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("source content written before next_source()")]
    NoSourceOpen,
    #[error("next_source() called after all {declared} declared source(s)")]
    TooManySources { declared: usize },
}

// ---------------------------------------------------------------------------
// StreamWriter
// ---------------------------------------------------------------------------

/// Incremental source map writer.
///
/// Call order: `next_source` / `write_source_*` and `write_generated_line`
/// in any interleaving, then `finish` exactly once. A writer dropped without
/// `finish` leaves the output truncated.
///
/// # Example
/// ```
/// use vlqmap::mappings::Segment;
/// use vlqmap::stream::{StreamHeader, StreamWriter};
///
/// let header = StreamHeader::new("out.js", vec!["a.js".into()]);
/// let mut w = StreamWriter::new(Vec::new(), &header).unwrap();
/// w.next_source().unwrap();
/// w.write_source_line("let a = 1;").unwrap();
/// w.write_generated_line(&[Segment::new(0, 0, 0, 0)]).unwrap();
/// let json = w.finish().unwrap();
/// assert!(String::from_utf8(json).unwrap().ends_with(r#""mappings":"AAAA"}"#));
/// ```
pub struct StreamWriter<W: Write, S: Read + Write + Seek = Cursor<Vec<u8>>> {
    dst: BufWriter<W>,
    spool: S,
    encoder: MappingsEncoder,
    /// Reused per-line encoding buffer.
    line_buf: String,
    declared_sources: usize,
    sources_begun: usize,
}

impl<W: Write> StreamWriter<W> {
    /// Create a writer that spools the mapping body in memory.
    pub fn new(sink: W, header: &StreamHeader) -> Result<Self, StreamError> {
        Self::with_spool(sink, header, Cursor::new(Vec::new()))
    }
}

impl<W: Write, S: Read + Write + Seek> StreamWriter<W, S> {
    /// Create a writer that spools the mapping body into `spool`.
    ///
    /// The spool must be empty and positioned at its start.
    pub fn with_spool(sink: W, header: &StreamHeader, spool: S) -> Result<Self, StreamError> {
        let mut w = Self {
            dst: BufWriter::with_capacity(BUF_SIZE, sink),
            spool,
            encoder: MappingsEncoder::new(NameMode::for_names(&header.names)),
            line_buf: String::new(),
            declared_sources: header.sources.len(),
            sources_begun: 0,
        };
        w.write_header(header)?;
        Ok(w)
    }

    fn write_header(&mut self, header: &StreamHeader) -> io::Result<()> {
        self.dst.write_all(br#"{"version":3,"file":"#)?;
        write_json_string(&mut self.dst, &header.file)?;
        self.dst.write_all(br#","sources":"#)?;
        write_json_array(&mut self.dst, &header.sources)?;
        if !header.names.is_empty() {
            self.dst.write_all(br#","names":"#)?;
            write_json_array(&mut self.dst, &header.names)?;
        }
        self.dst.write_all(br#","sourcesContent":["#)
    }

    /// Start the content of the next declared source.
    pub fn next_source(&mut self) -> Result<(), StreamError> {
        if self.sources_begun >= self.declared_sources {
            return Err(StreamError::TooManySources {
                declared: self.declared_sources,
            });
        }
        let sep: &[u8] = if self.sources_begun == 0 { b"\"" } else { b"\",\"" };
        self.dst.write_all(sep)?;
        self.sources_begun += 1;
        Ok(())
    }

    /// Append one line of the current source; a newline is added.
    pub fn write_source_line(&mut self, line: &str) -> Result<(), StreamError> {
        self.ensure_source_open()?;
        let mut sink = WriteSink(&mut self.dst);
        escape::escape(&mut line.chars(), &mut sink)?;
        sink.put_str("\\n")?;
        Ok(())
    }

    /// Append UTF-8 text to the current source, escaped for the JSON
    /// string. No newline is added. Returns the number of code points read.
    pub fn write_source_text<R: io::BufRead>(&mut self, reader: R) -> Result<usize, StreamError> {
        self.ensure_source_open()?;
        let mut src = Utf8Reader::new(reader);
        Ok(escape::escape(&mut src, &mut WriteSink(&mut self.dst))?)
    }

    fn ensure_source_open(&self) -> Result<(), StreamError> {
        if self.sources_begun == 0 {
            return Err(StreamError::NoSourceOpen);
        }
        Ok(())
    }

    /// Encode the next generated line. All of the line's segments must be
    /// supplied in this call, in ascending generated column order.
    pub fn write_generated_line(&mut self, segments: &[Segment]) -> Result<(), StreamError> {
        self.line_buf.clear();
        self.encoder.encode_line(segments, &mut self.line_buf);
        self.spool.write_all(self.line_buf.as_bytes())?;
        Ok(())
    }

    /// Generated lines written so far.
    #[inline]
    pub fn lines_written(&self) -> usize {
        self.encoder.lines_written()
    }

    /// Segments written so far.
    #[inline]
    pub fn segments_written(&self) -> usize {
        self.encoder.segments_written()
    }

    /// Close the envelope, flush, and return the inner sink.
    ///
    /// Declared sources that were never begun are written as empty content.
    pub fn finish(mut self) -> Result<W, StreamError> {
        self.spool.flush()?;
        if self.sources_begun > 0 {
            self.dst.write_all(b"\"")?;
        }
        // Sources that were never begun get empty content so that
        // sourcesContent stays parallel to sources.
        for i in self.sources_begun..self.declared_sources {
            let entry: &[u8] = if i == 0 { b"\"\"" } else { b",\"\"" };
            self.dst.write_all(entry)?;
        }
        self.dst.write_all(br#"],"mappings":""#)?;

        self.spool.seek(SeekFrom::Start(0))?;
        let mut body = Utf8Reader::new(BufReader::with_capacity(BUF_SIZE, &mut self.spool));
        escape::escape(&mut body, &mut WriteSink(&mut self.dst))?;

        self.dst.write_all(br#""}"#)?;
        self.dst.flush()?;

        debug!(
            "stream map finished: {}/{} sources, {} lines, {} segments",
            self.sources_begun,
            self.declared_sources,
            self.encoder.lines_written(),
            self.encoder.segments_written()
        );
        self.dst.into_inner().map_err(|e| e.into_error().into())
    }
}

fn write_json_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    w.write_all(b"\"")?;
    escape::escape(&mut s.chars(), &mut WriteSink(&mut *w))?;
    w.write_all(b"\"")
}

fn write_json_array<W: Write>(w: &mut W, items: &[String]) -> io::Result<()> {
    w.write_all(b"[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        write_json_string(w, item)?;
    }
    w.write_all(b"]")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
