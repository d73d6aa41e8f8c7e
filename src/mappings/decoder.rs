// Mappings decoder: compact VLQ text -> `Mappings`.
//
// Decoding never fails. A field whose symbols do not decode (bad symbol,
// truncated run, overflow, or a result outside the u32 range) keeps the
// previous baseline value, and the rest of the token is still read. The
// number of such fields is reported through `DecodeStats` so callers can tell
// a clean decode from a degraded one.

use log::{debug, trace, warn};

use super::NameMode;
use super::model::{Mappings, Segment};
use super::vlq::{VlqError, VlqReader};

/// Summary of one decode pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Generated lines produced.
    pub lines: usize,
    /// Segments produced.
    pub segments: usize,
    /// Fields that fell back to their baseline value.
    pub degraded_fields: usize,
    /// Empty tokens between commas (no segment emitted).
    pub skipped_tokens: usize,
}

impl DecodeStats {
    /// True when at least one field fell back to its baseline.
    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.degraded_fields > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    GeneratedColumn,
    SourceIndex,
    SourceLine,
    SourceColumn,
    NameIndex,
}

impl Field {
    fn label(self) -> &'static str {
        match self {
            Field::GeneratedColumn => "generated column",
            Field::SourceIndex => "source index",
            Field::SourceLine => "source line",
            Field::SourceColumn => "source column",
            Field::NameIndex => "name index",
        }
    }
}

/// Stateful decoder for one document.
#[derive(Debug, Clone)]
pub struct MappingsDecoder {
    mode: NameMode,
    /// Previous segment; its source/name fields are the running baseline.
    last: Segment,
    stats: DecodeStats,
}

impl MappingsDecoder {
    pub fn new(mode: NameMode) -> Self {
        Self {
            mode,
            last: Segment::default(),
            stats: DecodeStats::default(),
        }
    }

    /// Decode one `;`-delimited line group. `line` is only used for logging.
    pub fn decode_line(&mut self, group: &str, line: usize) -> Vec<Segment> {
        let mut segments = Vec::new();
        self.stats.lines += 1;
        if group.is_empty() {
            return segments;
        }

        let mut last_column = 0u32;
        for (pos, token) in group.split(',').enumerate() {
            if token.is_empty() {
                self.stats.skipped_tokens += 1;
                continue;
            }
            let seg = self.decode_token(token, last_column, line, pos);
            last_column = seg.generated_column;
            self.last = seg;
            segments.push(seg);
        }
        self.stats.segments += segments.len();
        segments
    }

    fn decode_token(&mut self, token: &str, last_column: u32, line: usize, pos: usize) -> Segment {
        let mut r = VlqReader::new(token.as_bytes());
        let base = self.last;
        let mut seg = Segment {
            generated_column: self.field(&mut r, last_column, Field::GeneratedColumn, line, pos),
            ..base
        };
        seg.source_index = self.field(&mut r, base.source_index, Field::SourceIndex, line, pos);
        seg.source_line = self.field(&mut r, base.source_line, Field::SourceLine, line, pos);
        seg.source_column = self.field(&mut r, base.source_column, Field::SourceColumn, line, pos);
        if self.mode.is_tracked() {
            seg.name_index = self.field(&mut r, base.name_index, Field::NameIndex, line, pos);
        }
        seg
    }

    fn field(
        &mut self,
        reader: &mut VlqReader<'_>,
        base: u32,
        field: Field,
        line: usize,
        pos: usize,
    ) -> u32 {
        let delta = match reader.next_value() {
            Ok(delta) => delta,
            // Four-field segments are legal when names are tracked.
            Err(VlqError::Empty) if field == Field::NameIndex => return base,
            Err(e) => {
                self.degrade(field, line, pos, &e);
                return base;
            }
        };
        match u32::try_from(i64::from(base) + delta) {
            Ok(value) => value,
            Err(_) => {
                self.degrade(field, line, pos, &format_args!("{base} + {delta} out of range"));
                base
            }
        }
    }

    fn degrade(&mut self, field: Field, line: usize, pos: usize, why: &dyn std::fmt::Display) {
        self.stats.degraded_fields += 1;
        trace!(
            "line {line}, segment {pos}: {} kept baseline ({why})",
            field.label()
        );
    }

    #[inline]
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }
}

/// Decode a whole `mappings` string.
pub fn decode(raw: &str, mode: NameMode) -> Mappings {
    decode_with_stats(raw, mode).0
}

/// Decode a whole `mappings` string and report how it went.
///
/// The line count always equals the number of `;`-separated groups, so the
/// empty string yields one empty line.
pub fn decode_with_stats(raw: &str, mode: NameMode) -> (Mappings, DecodeStats) {
    let mut dec = MappingsDecoder::new(mode);
    let mappings: Mappings = raw
        .split(';')
        .enumerate()
        .map(|(line, group)| dec.decode_line(group, line))
        .collect();
    let stats = dec.stats();

    debug!(
        "decoded mappings: {} lines, {} segments",
        stats.lines, stats.segments
    );
    if stats.is_degraded() {
        warn!(
            "mappings decoded with {} degraded field(s); positions may be imprecise",
            stats.degraded_fields
        );
    }
    (mappings, stats)
}
