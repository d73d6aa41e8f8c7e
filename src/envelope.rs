// Source map v3 JSON envelope.
//
// The envelope carries the source table (`sources`, `sourcesContent`,
// `names`) next to the compact `mappings` string. Parsing decodes the
// mappings into a `Mappings` model; serializing re-encodes them with minimal
// deltas. Missing `sourcesContent` entries are reported back so the file
// layer can resolve them from disk.

use std::io::Write;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::mappings::{self, DecodeStats, Mappings, NameMode};

/// The only envelope version this crate reads or writes.
pub const VERSION: u32 = 3;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Envelope schema failures.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("invalid source map JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported source map version {0} (expected 3)")]
    UnsupportedVersion(u32),
    #[error("sourcesContent has {contents} entries but sources has {sources}")]
    ContentLengthMismatch { sources: usize, contents: usize },
    #[error("generated line {line}: source index {index} out of range ({sources} sources)")]
    SourceIndexOutOfRange {
        line: usize,
        index: u32,
        sources: usize,
    },
    #[error("generated line {line}: name index {index} out of range ({names} names)")]
    NameIndexOutOfRange {
        line: usize,
        index: u32,
        names: usize,
    },
}

// ---------------------------------------------------------------------------
// Wire structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap {
    version: u32,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    source_root: Option<String>,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default)]
    sources_content: Option<Vec<Option<String>>>,
    #[serde(default)]
    names: Vec<String>,
    mappings: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMapRef<'a> {
    version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_root: Option<&'a str>,
    sources: &'a [String],
    sources_content: &'a [String],
    #[serde(skip_serializing_if = "is_empty_slice")]
    names: &'a [String],
    mappings: String,
}

fn is_empty_slice(items: &&[String]) -> bool {
    items.is_empty()
}

// ---------------------------------------------------------------------------
// Source table
// ---------------------------------------------------------------------------

/// Parallel `sources` / `sourcesContent` tables plus `names`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTable {
    pub sources: Vec<String>,
    /// Same length as `sources`.
    pub sources_content: Vec<String>,
    pub names: Vec<String>,
}

impl SourceTable {
    /// Add a source and its content, returning its index.
    pub fn push_source(&mut self, name: impl Into<String>, content: impl Into<String>) -> u32 {
        self.sources.push(name.into());
        self.sources_content.push(content.into());
        (self.sources.len() - 1) as u32
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Segment layout implied by the names table.
    #[inline]
    pub fn name_mode(&self) -> NameMode {
        NameMode::for_names(&self.names)
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Serialization options.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Indent the JSON output.
    pub pretty: bool,
}

// ---------------------------------------------------------------------------
// SourceMap
// ---------------------------------------------------------------------------

/// A decoded source map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    pub file: Option<String>,
    /// Prefix joined to each source when resolving content from disk.
    pub source_root: Option<String>,
    pub table: SourceTable,
    pub mappings: Mappings,
}

/// Result of parsing an envelope.
#[derive(Debug, Clone)]
pub struct ParsedMap {
    pub map: SourceMap,
    /// Indices whose `sourcesContent` entry was absent or `null`; their
    /// content is empty until resolved.
    pub missing_content: Vec<usize>,
    /// How the `mappings` string decoded.
    pub decode: DecodeStats,
}

impl SourceMap {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            ..Self::default()
        }
    }

    /// Parse a JSON envelope.
    pub fn from_json(bytes: &[u8]) -> Result<ParsedMap, EnvelopeError> {
        let raw: RawSourceMap = serde_json::from_slice(bytes)?;
        if raw.version != VERSION {
            return Err(EnvelopeError::UnsupportedVersion(raw.version));
        }

        let n = raw.sources.len();
        let (sources_content, missing_content): (Vec<String>, Vec<usize>) = match raw.sources_content {
            None => (vec![String::new(); n], (0..n).collect()),
            Some(contents) if contents.len() != n => {
                return Err(EnvelopeError::ContentLengthMismatch {
                    sources: n,
                    contents: contents.len(),
                });
            }
            Some(contents) => {
                let missing = contents
                    .iter()
                    .enumerate()
                    .filter_map(|(i, c)| c.is_none().then_some(i))
                    .collect();
                (contents.into_iter().map(Option::unwrap_or_default).collect(), missing)
            }
        };

        let (mappings, decode) =
            mappings::decode_with_stats(&raw.mappings, NameMode::for_names(&raw.names));

        debug!(
            "parsed source map {:?}: {} sources ({} without content), {} names",
            raw.file.as_deref().unwrap_or(""),
            n,
            missing_content.len(),
            raw.names.len()
        );

        Ok(ParsedMap {
            map: SourceMap {
                file: raw.file,
                source_root: raw.source_root,
                table: SourceTable {
                    sources: raw.sources,
                    sources_content,
                    names: raw.names,
                },
                mappings,
            },
            missing_content,
            decode,
        })
    }

    /// Compact `mappings` encoding for this map's names table.
    pub fn mappings_string(&self) -> String {
        mappings::encode(&self.mappings, self.table.name_mode())
    }

    /// Serialize to a writer.
    pub fn write_json<W: Write>(&self, w: W, opts: WriteOptions) -> Result<(), EnvelopeError> {
        let raw = RawSourceMapRef {
            version: VERSION,
            file: self.file.as_deref(),
            source_root: self.source_root.as_deref(),
            sources: &self.table.sources,
            sources_content: &self.table.sources_content,
            names: &self.table.names,
            mappings: self.mappings_string(),
        };
        if opts.pretty {
            serde_json::to_writer_pretty(w, &raw)?;
        } else {
            serde_json::to_writer(w, &raw)?;
        }
        Ok(())
    }

    /// Serialize to a byte vector.
    pub fn to_json(&self, opts: WriteOptions) -> Result<Vec<u8>, EnvelopeError> {
        let mut out = Vec::new();
        self.write_json(&mut out, opts)?;
        Ok(out)
    }

    /// Check that every segment references an existing source (and name,
    /// when names are tracked). Reports the first violation.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        let sources = self.table.sources.len();
        let names = self.table.names.len();
        let tracked = self.table.name_mode().is_tracked();
        for (line, seg) in self.mappings.iter() {
            if seg.source_index as usize >= sources {
                return Err(EnvelopeError::SourceIndexOutOfRange {
                    line,
                    index: seg.source_index,
                    sources,
                });
            }
            if tracked && seg.name_index as usize >= names {
                return Err(EnvelopeError::NameIndexOutOfRange {
                    line,
                    index: seg.name_index,
                    names,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappings::Segment;

    const READER_FIXTURE: &str = r#"{"version":3,"sources":["f1.js","f2.js"],"names":[],"mappings":"AAAA;AACA;AACA;AACA;AACA;AACA;AACA;ACNA;AACA;AACA","file":"public/javascripts/app.js","sourcesContent":["alert('f1-1');\nalert('f1-2');\nalert('f1-3');\n;\nalert('f1-4');\n\n","alert('f2-1');\nalert('f2-2');\n"]}"#;

    #[test]
    fn parse_fixture() {
        let parsed = SourceMap::from_json(READER_FIXTURE.as_bytes()).unwrap();
        let map = parsed.map;
        assert_eq!(map.file.as_deref(), Some("public/javascripts/app.js"));
        assert_eq!(map.table.sources, vec!["f1.js", "f2.js"]);
        assert!(parsed.missing_content.is_empty());
        assert_eq!(map.mappings.line_count(), 10);
        assert_eq!(map.mappings.line(7).unwrap(), &[Segment::new(0, 1, 0, 0)]);
        assert!(!parsed.decode.is_degraded());
        map.validate().unwrap();
    }

    #[test]
    fn wrong_version_is_rejected() {
        let err = SourceMap::from_json(br#"{"version":2,"mappings":""}"#).unwrap_err();
        assert!(matches!(err, EnvelopeError::UnsupportedVersion(2)));
    }

    #[test]
    fn invalid_json_is_rejected() {
        let err = SourceMap::from_json(b"{\"version\":3,").unwrap_err();
        assert!(matches!(err, EnvelopeError::Json(_)));
        let err = SourceMap::from_json(br#"{"version":3}"#).unwrap_err();
        assert!(matches!(err, EnvelopeError::Json(_)));
    }

    #[test]
    fn content_length_mismatch_is_rejected() {
        let json = br#"{"version":3,"sources":["a","b"],"sourcesContent":["x"],"mappings":""}"#;
        let err = SourceMap::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::ContentLengthMismatch {
                sources: 2,
                contents: 1
            }
        ));
    }

    #[test]
    fn absent_and_null_content_are_reported_missing() {
        let json = br#"{"version":3,"sources":["a","b"],"mappings":"AAAA"}"#;
        assert_eq!(SourceMap::from_json(json).unwrap().missing_content, vec![0, 1]);

        let json = br#"{"version":3,"sources":["a","b"],"sourcesContent":["x",null],"mappings":"AAAA"}"#;
        let parsed = SourceMap::from_json(json).unwrap();
        assert_eq!(parsed.missing_content, vec![1]);
        assert_eq!(parsed.map.table.sources_content, vec!["x", ""]);
    }

    #[test]
    fn names_select_five_field_layout() {
        let json = br#"{"version":3,"sources":["a"],"sourcesContent":[""],"names":["x","y"],"mappings":"AAAAC"}"#;
        let map = SourceMap::from_json(json).unwrap().map;
        assert_eq!(map.mappings.line(0).unwrap()[0].name_index, 1);
        assert_eq!(map.mappings_string(), "AAAAC");
        map.validate().unwrap();
    }

    #[test]
    fn serialization_omits_empty_optional_fields() {
        let mut map = SourceMap::default();
        map.table.push_source("a.js", "x");
        map.mappings.push_line(vec![Segment::new(0, 0, 0, 0)]);
        let json = String::from_utf8(map.to_json(WriteOptions::default()).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"version":3,"sources":["a.js"],"sourcesContent":["x"],"mappings":"AAAA"}"#
        );
    }

    #[test]
    fn json_roundtrip_preserves_model() {
        let map = SourceMap::from_json(READER_FIXTURE.as_bytes()).unwrap().map;
        let json = map.to_json(WriteOptions { pretty: true }).unwrap();
        let back = SourceMap::from_json(&json).unwrap().map;
        assert_eq!(back, map);
    }

    #[test]
    fn validate_reports_out_of_range_indices() {
        let mut map = SourceMap::new("o.js");
        map.table.push_source("a.js", "");
        map.mappings.push_line(vec![]);
        map.mappings.push_line(vec![Segment::new(0, 1, 0, 0)]);
        assert!(matches!(
            map.validate(),
            Err(EnvelopeError::SourceIndexOutOfRange {
                line: 1,
                index: 1,
                sources: 1
            })
        ));

        let mut map = SourceMap::new("o.js");
        map.table.push_source("a.js", "");
        map.table.names.push("n".into());
        map.mappings.push_line(vec![Segment::new(0, 0, 0, 0).with_name(3)]);
        assert!(matches!(
            map.validate(),
            Err(EnvelopeError::NameIndexOutOfRange { index: 3, .. })
        ));
    }
}
