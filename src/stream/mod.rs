// Incremental source map output.
//
// - `escape` — JSON / JavaScript-literal-safe string escaping over code point
//              sources and sinks
// - `writer` — `StreamWriter`, which emits the envelope, source content and
//              mappings without materializing a `Mappings` model

pub mod escape;
pub mod writer;

pub use escape::{CharSink, CharSource, Utf8Reader, WriteSink, escape, escape_str};
pub use writer::{StreamError, StreamHeader, StreamWriter};
