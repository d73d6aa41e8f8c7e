//! vlqmap: source map revision 3 encoding and decoding in Rust.
//!
//! The crate provides:
//! - The `mappings` codec: base64 VLQ integers, the per-line segment model,
//!   and the delta-compressed `;`/`,` text transcoder (`mappings`)
//! - A streaming writer that emits a whole map without building the model
//!   (`stream`)
//! - The version 3 JSON envelope and source table (`envelope`)
//! - Identity generation and merging of maps (`ops`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use vlqmap::mappings::{self, NameMode};
//! use vlqmap::ops::{self, MergeOptions};
//!
//! let a = ops::generate_str("a.js", "one\ntwo");
//! let b = ops::generate_str("b.js", "three");
//! let merged = ops::merge("bundle.js", [&a, &b], MergeOptions::default());
//! assert_eq!(merged.mappings_string(), "AAAA;AACA;ACDA");
//!
//! let decoded = mappings::decode("AAAA;AACA;ACDA", NameMode::Untracked);
//! assert_eq!(decoded, merged.mappings);
//! ```

pub mod envelope;
pub mod io;
pub mod mappings;
pub mod ops;
pub mod stream;

#[cfg(feature = "cli")]
pub mod cli;

pub use envelope::{EnvelopeError, ParsedMap, SourceMap, SourceTable, WriteOptions};
pub use mappings::{DecodeStats, Mappings, NameMode, Segment};
