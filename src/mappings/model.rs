// In-memory mapping model: one segment list per generated line.

/// One generated-to-original position correspondence.
///
/// The generated line is implicit in the segment's position inside
/// [`Mappings`]. All fields are zero-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Segment {
    pub generated_column: u32,
    pub source_index: u32,
    pub source_line: u32,
    pub source_column: u32,
    pub name_index: u32,
}

impl Segment {
    pub const fn new(
        generated_column: u32,
        source_index: u32,
        source_line: u32,
        source_column: u32,
    ) -> Self {
        Self {
            generated_column,
            source_index,
            source_line,
            source_column,
            name_index: 0,
        }
    }

    pub const fn with_name(mut self, name_index: u32) -> Self {
        self.name_index = name_index;
        self
    }
}

/// Decoded mappings, indexed by generated line.
///
/// Lines are contiguous; an empty generated line is an empty segment list.
/// Segments within a line are expected in ascending generated column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mappings {
    lines: Vec<Vec<Segment>>,
}

impl Mappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(lines: usize) -> Self {
        Self {
            lines: Vec::with_capacity(lines),
        }
    }

    pub fn from_lines(lines: Vec<Vec<Segment>>) -> Self {
        Self { lines }
    }

    pub fn into_lines(self) -> Vec<Vec<Segment>> {
        self.lines
    }

    /// Number of generated lines, including empty ones.
    #[inline]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Segments of generated line `line`, if it exists.
    #[inline]
    pub fn line(&self, line: usize) -> Option<&[Segment]> {
        self.lines.get(line).map(Vec::as_slice)
    }

    /// Per-line view.
    pub fn lines(&self) -> impl ExactSizeIterator<Item = &[Segment]> + '_ {
        self.lines.iter().map(Vec::as_slice)
    }

    /// Total segment count across all lines.
    pub fn segment_count(&self) -> usize {
        self.lines.iter().map(Vec::len).sum()
    }

    /// Append a generated line.
    pub fn push_line(&mut self, segments: Vec<Segment>) {
        self.lines.push(segments);
    }

    /// Append a segment to generated line `line`, growing the model with
    /// empty lines as needed.
    pub fn push_segment(&mut self, line: usize, segment: Segment) {
        if self.lines.len() <= line {
            self.lines.resize_with(line + 1, Vec::new);
        }
        self.lines[line].push(segment);
    }

    /// Flattened `(generated_line, segment)` pairs in line order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Segment)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .flat_map(|(line, segs)| segs.iter().map(move |s| (line, s)))
    }
}

impl FromIterator<Vec<Segment>> for Mappings {
    fn from_iter<I: IntoIterator<Item = Vec<Segment>>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().collect(),
        }
    }
}
