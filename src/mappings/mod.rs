// Source map `mappings` field: model and compact text transcoding.
//
// # Modules
//
// - `vlq`     — Base64 VLQ signed integer encoding
// - `model`   — Per-line segment lists (`Mappings`, `Segment`)
// - `decoder` — Compact text -> `Mappings`, tolerant of malformed fields
// - `encoder` — `Mappings` -> compact text with minimal deltas
//
// Both directions track the same two baselines: the generated column, reset
// at every `;`, and the previous segment's source index / line / column /
// name index, carried across the whole document.

pub mod decoder;
pub mod encoder;
pub mod model;
pub mod vlq;

pub use decoder::{DecodeStats, MappingsDecoder, decode, decode_with_stats};
pub use encoder::{MappingsEncoder, encode};
pub use model::{Mappings, Segment};
pub use vlq::VlqError;

/// Whether segments carry the fifth (name index) field.
///
/// Chosen once per document from the names table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameMode {
    /// Four fields per segment; name indices are neither read nor written.
    #[default]
    Untracked,
    /// Five fields per segment when present.
    Tracked,
}

impl NameMode {
    /// `Tracked` iff `names` is non-empty.
    pub fn for_names<S>(names: &[S]) -> Self {
        if names.is_empty() {
            NameMode::Untracked
        } else {
            NameMode::Tracked
        }
    }

    #[inline]
    pub fn is_tracked(self) -> bool {
        self == NameMode::Tracked
    }
}
