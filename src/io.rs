// File-level helpers for reading, writing and generating source maps.
//
// Reading resolves `sourcesContent` entries that the envelope leaves out by
// loading `<map dir>/<sourceRoot><source>` through a `SourceResolver`.
// Writing reports `WriteStats`, with a SHA-256 digest of the written bytes
// when the `file-io` feature is enabled.

use std::fs::File;
#[cfg(feature = "file-io")]
use std::io::Write;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::warn;
#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::envelope::{EnvelopeError, ParsedMap, SourceMap, WriteOptions};
use crate::mappings::Segment;
use crate::ops;
use crate::stream::{StreamError, StreamHeader, StreamWriter};

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file-level operations.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Opening, reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// A source referenced by the map has no content on disk.
    #[error("source content not found: {}", .path.display())]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The map file is not a valid v3 envelope.
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),
    /// The streaming writer was misused or its sink failed.
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),
}

// ---------------------------------------------------------------------------
// Options and stats
// ---------------------------------------------------------------------------

/// What to do when a source's content cannot be read from disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingSources {
    /// Fail the read.
    #[default]
    Error,
    /// Use empty content and log a warning.
    Empty,
}

/// Options for `read_file`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    pub missing_sources: MissingSources,
}

/// Statistics returned by the write helpers.
#[derive(Debug, Clone)]
pub struct WriteStats {
    /// Bytes written to the output file.
    pub bytes: u64,
    /// Generated lines in the written map.
    pub lines: usize,
    /// Segments in the written map.
    pub segments: usize,
    /// SHA-256 of the output (if `file-io` feature is enabled).
    pub sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Source resolution
// ---------------------------------------------------------------------------

/// Loads source content that a map does not embed.
pub trait SourceResolver {
    /// Read a whole text file.
    fn read_text(&self, path: &Path) -> io::Result<String>;

    /// Location of `source` for a map stored in `base_dir`.
    fn resolve_path(&self, base_dir: &Path, source_root: &str, source: &str) -> PathBuf {
        let joined = format!("{source_root}{source}");
        base_dir.join(joined.trim_start_matches('/'))
    }
}

/// Resolver backed by the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsResolver;

impl SourceResolver for FsResolver {
    fn read_text(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read a map file, loading missing source content relative to its directory.
pub fn read_file(path: &Path, opts: ReadOptions) -> Result<ParsedMap, IoError> {
    read_file_with(path, &FsResolver, opts)
}

/// `read_file` with a custom resolver for missing source content.
pub fn read_file_with<R: SourceResolver + ?Sized>(
    path: &Path,
    resolver: &R,
    opts: ReadOptions,
) -> Result<ParsedMap, IoError> {
    let bytes = std::fs::read(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    parse_with(&bytes, base_dir, resolver, opts)
}

/// Parse an envelope and resolve its missing content against `base_dir`.
///
/// On return, `missing_content` lists only the entries that stayed empty
/// under `MissingSources::Empty`.
pub fn parse_with<R: SourceResolver + ?Sized>(
    bytes: &[u8],
    base_dir: &Path,
    resolver: &R,
    opts: ReadOptions,
) -> Result<ParsedMap, IoError> {
    let mut parsed = SourceMap::from_json(bytes)?;
    let root = parsed.map.source_root.clone().unwrap_or_default();
    let mut unresolved = Vec::new();

    for &i in &parsed.missing_content {
        let path = resolver.resolve_path(base_dir, &root, &parsed.map.table.sources[i]);
        match resolver.read_text(&path) {
            Ok(text) => parsed.map.table.sources_content[i] = text,
            Err(e) if opts.missing_sources == MissingSources::Empty => {
                warn!("source content {}: {e}; using empty content", path.display());
                unresolved.push(i);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(IoError::SourceNotFound { path, source: e });
            }
            Err(e) => return Err(e.into()),
        }
    }
    parsed.missing_content = unresolved;
    Ok(parsed)
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Serialize `map` to `path`, replacing any existing file.
pub fn write_file(path: &Path, map: &SourceMap, opts: WriteOptions) -> Result<WriteStats, IoError> {
    let json = map.to_json(opts)?;
    std::fs::write(path, &json)?;

    #[cfg(feature = "file-io")]
    let sha256 = Some(sha2::Sha256::digest(&json).into());
    #[cfg(not(feature = "file-io"))]
    let sha256: Option<[u8; 32]> = None;

    Ok(WriteStats {
        bytes: json.len() as u64,
        lines: map.mappings.line_count(),
        segments: map.mappings.segment_count(),
        sha256,
    })
}

// ---------------------------------------------------------------------------
// Generating
// ---------------------------------------------------------------------------

/// Identity map for a text file. `name` defaults to the file name.
pub fn generate_file(path: &Path, name: Option<&str>) -> Result<SourceMap, IoError> {
    let name = name.map_or_else(|| display_name(path), str::to_owned);
    let reader = BufReader::with_capacity(BUF_SIZE, File::open(path)?);
    Ok(ops::generate(&name, reader)?)
}

/// Stream an identity map for `input` straight to `output`.
///
/// Produces the same map as `generate_file`, but only one input line is held
/// in memory at a time. With `file-io` the encoded mappings are spooled in an
/// anonymous temp file; without it they are spooled in memory.
pub fn stream_generate_file(
    input: &Path,
    output: &Path,
    name: Option<&str>,
) -> Result<WriteStats, IoError> {
    let name = name.map_or_else(|| display_name(input), str::to_owned);
    let mut reader = BufReader::with_capacity(BUF_SIZE, File::open(input)?);

    #[cfg(feature = "file-io")]
    let sink = HashingWriter {
        inner: File::create(output)?,
        hasher: sha2::Sha256::new(),
    };
    #[cfg(not(feature = "file-io"))]
    let sink = File::create(output)?;

    let header = StreamHeader::new(name.clone(), vec![name]);
    #[cfg(feature = "file-io")]
    let mut writer = StreamWriter::with_spool(sink, &header, tempfile::tempfile()?)?;
    #[cfg(not(feature = "file-io"))]
    let mut writer = StreamWriter::new(sink, &header)?;
    writer.next_source()?;

    let mut line = Vec::new();
    let mut line_no = 0u32;
    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line)?;
        writer.write_source_text(&line[..])?;
        writer.write_generated_line(&[Segment::new(0, 0, line_no, 0)])?;
        if read == 0 || line.last() != Some(&b'\n') {
            break;
        }
        line_no += 1;
    }

    let lines = writer.lines_written();
    let segments = writer.segments_written();
    let sink = writer.finish()?;

    #[cfg(feature = "file-io")]
    let (file, sha256) = (sink.inner, Some(sink.hasher.finalize().into()));
    #[cfg(not(feature = "file-io"))]
    let (file, sha256): (File, Option<[u8; 32]>) = (sink, None);

    Ok(WriteStats {
        bytes: file.metadata()?.len(),
        lines,
        segments,
        sha256,
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// Hashing writer (used with file-io feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "file-io")]
struct HashingWriter<W: Write> {
    inner: W,
    hasher: sha2::Sha256,
}

#[cfg(feature = "file-io")]
impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    struct MemResolver(HashMap<PathBuf, String>);

    impl SourceResolver for MemResolver {
        fn read_text(&self, path: &Path) -> io::Result<String> {
            self.0
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "not in memory"))
        }
    }

    const NO_CONTENT: &[u8] =
        br#"{"version":3,"sourceRoot":"src/","sources":["a.js","b.js"],"mappings":"AAAA;ACAA"}"#;

    #[test]
    fn missing_content_resolved_relative_to_base_dir() {
        let resolver = MemResolver(HashMap::from([
            (PathBuf::from("maps/src/a.js"), "let a;".to_string()),
            (PathBuf::from("maps/src/b.js"), "let b;".to_string()),
        ]));
        let parsed = parse_with(NO_CONTENT, Path::new("maps"), &resolver, ReadOptions::default())
            .unwrap();
        assert_eq!(parsed.map.table.sources_content, vec!["let a;", "let b;"]);
        assert!(parsed.missing_content.is_empty());
    }

    #[test]
    fn missing_source_is_an_io_failure_by_default() {
        let resolver = MemResolver(HashMap::from([(
            PathBuf::from("maps/src/a.js"),
            "let a;".to_string(),
        )]));
        let err = parse_with(NO_CONTENT, Path::new("maps"), &resolver, ReadOptions::default())
            .unwrap_err();
        match err {
            IoError::SourceNotFound { path, .. } => assert_eq!(path, Path::new("maps/src/b.js")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn lenient_policy_leaves_content_empty() {
        let resolver = MemResolver(HashMap::new());
        let opts = ReadOptions {
            missing_sources: MissingSources::Empty,
        };
        let parsed = parse_with(NO_CONTENT, Path::new("maps"), &resolver, opts).unwrap();
        assert_eq!(parsed.missing_content, vec![0, 1]);
        assert_eq!(parsed.map.table.sources_content, vec!["", ""]);
    }

    #[test]
    fn envelope_failure_is_distinct_from_io_failure() {
        let err = parse_with(
            br#"{"version":4,"mappings":""}"#,
            Path::new(""),
            &FsResolver,
            ReadOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            IoError::Envelope(EnvelopeError::UnsupportedVersion(4))
        ));

        let dir = tempdir().unwrap();
        let err = read_file(&dir.path().join("absent.map"), ReadOptions::default()).unwrap_err();
        assert!(matches!(err, IoError::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
    }

    #[test]
    fn read_file_loads_sibling_sources() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.js"), "A").unwrap();
        std::fs::write(dir.path().join("src/b.js"), "B").unwrap();
        let map_path = dir.path().join("out.map");
        std::fs::write(&map_path, NO_CONTENT).unwrap();

        let parsed = read_file(&map_path, ReadOptions::default()).unwrap();
        assert_eq!(parsed.map.table.sources_content, vec!["A", "B"]);
    }

    #[test]
    fn write_then_read_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gen.map");
        let map = ops::generate_str("gen.js", "a\nb\n");

        let stats = write_file(&path, &map, WriteOptions::default()).unwrap();
        assert_eq!(stats.lines, 3);
        assert_eq!(stats.segments, 3);
        assert_eq!(stats.bytes, std::fs::metadata(&path).unwrap().len());
        #[cfg(feature = "file-io")]
        assert!(stats.sha256.is_some());

        let back = read_file(&path, ReadOptions::default()).unwrap().map;
        assert_eq!(back, map);
    }

    #[test]
    fn streamed_generate_matches_in_memory_generate() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("app.js");
        let output = dir.path().join("app.js.map");
        std::fs::write(&input, "let x = \"1\";\n\tlet y = 2;\n\nend").unwrap();

        let stats = stream_generate_file(&input, &output, None).unwrap();
        assert_eq!(stats.lines, 4);

        let streamed = read_file(&output, ReadOptions::default()).unwrap().map;
        let generated = generate_file(&input, None).unwrap();
        assert_eq!(streamed, generated);
        assert_eq!(streamed.table.sources, vec!["app.js"]);
    }

    #[test]
    fn streamed_generate_bytes_match_serialized_map() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("big.js");
        let streamed = dir.path().join("streamed.map");
        let written = dir.path().join("written.map");
        let text: String = (0..5000).map(|i| format!("let v{i} = \"{i}\";\t\n")).collect();
        std::fs::write(&input, &text).unwrap();

        let stats = stream_generate_file(&input, &streamed, None).unwrap();
        assert_eq!(stats.lines, 5001);
        write_file(&written, &generate_file(&input, None).unwrap(), WriteOptions::default())
            .unwrap();
        assert_eq!(std::fs::read(&streamed).unwrap(), std::fs::read(&written).unwrap());
    }

    #[cfg(feature = "file-io")]
    #[test]
    fn streamed_digest_matches_file_bytes() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.js");
        let output = dir.path().join("in.js.map");
        std::fs::write(&input, "x\n").unwrap();

        let stats = stream_generate_file(&input, &output, Some("named.js")).unwrap();
        let bytes = std::fs::read(&output).unwrap();
        let expected: [u8; 32] = sha2::Sha256::digest(&bytes).into();
        assert_eq!(stats.sha256, Some(expected));
        assert_eq!(stats.bytes, bytes.len() as u64);
    }
}
