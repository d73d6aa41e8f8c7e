// Mappings encoder: `Mappings` -> compact `;`/`,` separated VLQ text.
//
// `MappingsEncoder` owns the delta baselines for one encoding pass and works
// one generated line at a time, so the same state machine backs both the
// whole-document `encode` and the streaming writer.

use super::NameMode;
use super::model::{Mappings, Segment};
use super::vlq;

/// Rough symbols per encoded segment, used for capacity hints.
const SEGMENT_SIZE_HINT: usize = 5;

/// Incremental line-by-line encoder.
#[derive(Debug, Clone)]
pub struct MappingsEncoder {
    mode: NameMode,
    /// Previous segment; its source/name fields are the running baseline.
    last: Segment,
    lines_written: usize,
    segments_written: usize,
}

impl MappingsEncoder {
    pub fn new(mode: NameMode) -> Self {
        Self {
            mode,
            last: Segment::default(),
            lines_written: 0,
            segments_written: 0,
        }
    }

    /// Append one generated line (preceded by `;` unless it is the first).
    ///
    /// `segments` must be in ascending generated column order.
    pub fn encode_line(&mut self, segments: &[Segment], out: &mut String) {
        if self.lines_written > 0 {
            out.push(';');
        }
        let mut last_column = 0u32;
        for (i, seg) in segments.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            vlq::push_i64(out, delta(seg.generated_column, last_column));
            vlq::push_i64(out, delta(seg.source_index, self.last.source_index));
            vlq::push_i64(out, delta(seg.source_line, self.last.source_line));
            vlq::push_i64(out, delta(seg.source_column, self.last.source_column));
            if self.mode.is_tracked() {
                vlq::push_i64(out, delta(seg.name_index, self.last.name_index));
            }
            last_column = seg.generated_column;
            self.last = *seg;
        }
        self.lines_written += 1;
        self.segments_written += segments.len();
    }

    #[inline]
    pub fn mode(&self) -> NameMode {
        self.mode
    }

    #[inline]
    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    #[inline]
    pub fn segments_written(&self) -> usize {
        self.segments_written
    }
}

#[inline]
fn delta(value: u32, base: u32) -> i64 {
    i64::from(value) - i64::from(base)
}

/// Encode a whole model. Zero lines encode to the empty string.
pub fn encode(mappings: &Mappings, mode: NameMode) -> String {
    let mut out =
        String::with_capacity(mappings.segment_count() * SEGMENT_SIZE_HINT + mappings.line_count());
    let mut enc = MappingsEncoder::new(mode);
    for line in mappings.lines() {
        enc.encode_line(line, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_model_encodes_to_empty_string() {
        assert_eq!(encode(&Mappings::new(), NameMode::Untracked), "");
    }

    #[test]
    fn empty_lines_contribute_only_separators() {
        let m = Mappings::from_lines(vec![vec![], vec![Segment::new(0, 0, 1, 0)], vec![]]);
        assert_eq!(encode(&m, NameMode::Untracked), ";AACA;");
    }

    #[test]
    fn generated_column_resets_per_line() {
        let m = Mappings::from_lines(vec![
            vec![Segment::new(4, 0, 0, 0), Segment::new(10, 0, 0, 6)],
            vec![Segment::new(4, 0, 1, 0)],
        ]);
        // Line 2 restarts the column at 4 (not -6); source column 6 -> 0 is -6.
        assert_eq!(encode(&m, NameMode::Untracked), "IAAA,MAAM;IACN");
    }

    #[test]
    fn source_baseline_crosses_lines() {
        let m = Mappings::from_lines(vec![
            vec![Segment::new(0, 0, 0, 0)],
            vec![Segment::new(0, 1, 0, 0)],
            vec![Segment::new(0, 1, 1, 0)],
        ]);
        assert_eq!(encode(&m, NameMode::Untracked), "AAAA;ACAA;AACA");
    }

    #[test]
    fn tracked_mode_emits_name_deltas() {
        let m = Mappings::from_lines(vec![vec![
            Segment::new(0, 0, 0, 0).with_name(2),
            Segment::new(5, 0, 0, 5).with_name(1),
        ]]);
        assert_eq!(encode(&m, NameMode::Tracked), "AAAAE,KAAKD");
        assert_eq!(encode(&m, NameMode::Untracked), "AAAA,KAAK");
    }

    #[test]
    fn encoder_counts_output() {
        let mut enc = MappingsEncoder::new(NameMode::Untracked);
        let mut out = String::new();
        enc.encode_line(&[Segment::new(0, 0, 0, 0)], &mut out);
        enc.encode_line(&[], &mut out);
        assert_eq!(enc.lines_written(), 2);
        assert_eq!(enc.segments_written(), 1);
        assert_eq!(out, "AAAA;");
    }
}
