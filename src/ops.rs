// Map operations: identity generation and merging.
//
// `generate` builds a map whose generated line i points at line i, column 0
// of a single source holding the text itself. `merge` joins maps in order,
// concatenating their source and name tables and offsetting every segment's
// source and name indices into the merged tables.

use std::io::{self, BufRead};

use log::{debug, warn};

use crate::envelope::SourceMap;
use crate::mappings::{Mappings, Segment};

// ---------------------------------------------------------------------------
// Generate
// ---------------------------------------------------------------------------

/// Identity map for `text`, named `name`.
///
/// Line splitting follows `str::split('\n')`: a trailing unterminated
/// fragment counts as a line, so `"a\nb\n"` has three lines and `""` has one.
pub fn generate_str(name: &str, text: &str) -> SourceMap {
    identity_map(name, text.to_owned())
}

/// Identity map for everything readable from `reader`.
pub fn generate<R: BufRead>(name: &str, mut reader: R) -> io::Result<SourceMap> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(identity_map(name, text))
}

fn identity_map(name: &str, text: String) -> SourceMap {
    let line_count = text.bytes().filter(|&b| b == b'\n').count() + 1;
    let mappings: Mappings = (0..line_count)
        .map(|line| vec![Segment::new(0, 0, line as u32, 0)])
        .collect();

    let mut map = SourceMap::new(name);
    map.table.push_source(name, text);
    map.mappings = mappings;
    debug!("generated identity map for {name:?}: {line_count} lines");
    map
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Where each input's generated lines land in the merged map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinePlacement {
    /// Inputs follow each other: input k's line 0 comes right after the
    /// last line of input k-1.
    #[default]
    Concatenate,
    /// Generated line numbers are kept; inputs' segments on the same line
    /// are interleaved by generated column.
    Overlay,
}

/// Merge configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    pub placement: LinePlacement,
}

/// Merge `maps` in order into one map named `name`.
///
/// Each input's `sourceRoot` is folded into its source names, since the
/// merged map has a single root.
pub fn merge<'a, I>(name: &str, maps: I, opts: MergeOptions) -> SourceMap
where
    I: IntoIterator<Item = &'a SourceMap>,
{
    let mut out = SourceMap::new(name);
    let mut lines: Vec<Vec<Segment>> = Vec::new();
    let mut inputs = 0usize;
    let mut unnamed_with_segments: Vec<String> = Vec::new();

    for map in maps {
        let source_offset = out.table.sources.len() as u32;
        let name_offset = out.table.names.len() as u32;
        let offset_names = !map.table.names.is_empty();
        if !offset_names && map.mappings.segment_count() > 0 {
            unnamed_with_segments.push(map.file.clone().unwrap_or_default());
        }

        let root = map.source_root.as_deref().unwrap_or("");
        out.table
            .sources
            .extend(map.table.sources.iter().map(|s| format!("{root}{s}")));
        out.table
            .sources_content
            .extend_from_slice(&map.table.sources_content);
        out.table.names.extend_from_slice(&map.table.names);

        let first_line = match opts.placement {
            LinePlacement::Concatenate => lines.len(),
            LinePlacement::Overlay => 0,
        };
        for (i, segments) in map.mappings.lines().enumerate() {
            let target = first_line + i;
            if lines.len() <= target {
                lines.resize_with(target + 1, Vec::new);
            }
            lines[target].extend(segments.iter().map(|s| Segment {
                source_index: s.source_index.saturating_add(source_offset),
                name_index: if offset_names {
                    s.name_index.saturating_add(name_offset)
                } else {
                    s.name_index
                },
                ..*s
            }));
        }
        inputs += 1;
    }

    if opts.placement == LinePlacement::Overlay {
        for line in &mut lines {
            line.sort_by_key(|s| s.generated_column);
        }
    }

    if !out.table.names.is_empty() && !unnamed_with_segments.is_empty() {
        warn!(
            "merge into {name:?}: inputs {unnamed_with_segments:?} carry no names, \
             their segments now resolve to {:?}",
            out.table.names[0]
        );
    }

    out.mappings = Mappings::from_lines(lines);
    debug!(
        "merged {inputs} maps into {name:?} ({:?}): {} sources, {} lines",
        opts.placement,
        out.table.sources.len(),
        out.mappings.line_count()
    );
    out
}
