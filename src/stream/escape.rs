// JSON string escaping that is also safe inside JavaScript string literals.
//
// The escaper works one code point at a time over `CharSource` / `CharSink`,
// so the same routine serves in-memory strings and buffered byte streams.

use std::io::{self, BufRead, Write};

/// Something that yields code points one at a time.
pub trait CharSource {
    /// Next code point, or `None` at end of input.
    fn next_char(&mut self) -> io::Result<Option<char>>;
}

/// Something that accepts code points one at a time.
pub trait CharSink {
    fn put_char(&mut self, c: char) -> io::Result<()>;

    fn put_str(&mut self, s: &str) -> io::Result<()> {
        s.chars().try_for_each(|c| self.put_char(c))
    }
}

impl CharSource for std::str::Chars<'_> {
    #[inline]
    fn next_char(&mut self) -> io::Result<Option<char>> {
        Ok(self.next())
    }
}

impl CharSink for String {
    #[inline]
    fn put_char(&mut self, c: char) -> io::Result<()> {
        self.push(c);
        Ok(())
    }

    #[inline]
    fn put_str(&mut self, s: &str) -> io::Result<()> {
        self.push_str(s);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Byte stream adapters
// ---------------------------------------------------------------------------

/// Decodes UTF-8 code points from a buffered reader.
pub struct Utf8Reader<R: BufRead> {
    inner: R,
}

impl<R: BufRead> Utf8Reader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = match self.inner.fill_buf()?.first() {
            Some(&b) => b,
            None => return Ok(None),
        };
        self.inner.consume(1);
        Ok(Some(byte))
    }
}

/// Encoded length of a UTF-8 sequence from its leading byte, 0 if invalid.
#[inline]
fn utf8_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

fn invalid_utf8() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "stream did not contain valid UTF-8")
}

impl<R: BufRead> CharSource for Utf8Reader<R> {
    fn next_char(&mut self) -> io::Result<Option<char>> {
        let Some(lead) = self.read_byte()? else {
            return Ok(None);
        };
        let width = utf8_width(lead);
        if width == 0 {
            return Err(invalid_utf8());
        }
        let mut buf = [lead, 0, 0, 0];
        for slot in &mut buf[1..width] {
            *slot = self
                .read_byte()?
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "truncated UTF-8"))?;
        }
        let s = std::str::from_utf8(&buf[..width]).map_err(|_| invalid_utf8())?;
        Ok(s.chars().next())
    }
}

/// Writes code points as UTF-8 to a byte sink.
pub struct WriteSink<W: Write>(pub W);

impl<W: Write> CharSink for WriteSink<W> {
    #[inline]
    fn put_char(&mut self, c: char) -> io::Result<()> {
        let mut buf = [0u8; 4];
        self.0.write_all(c.encode_utf8(&mut buf).as_bytes())
    }

    #[inline]
    fn put_str(&mut self, s: &str) -> io::Result<()> {
        self.0.write_all(s.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Escaping
// ---------------------------------------------------------------------------

/// Copy `src` to `dst`, escaping it for use between JSON double quotes.
///
/// `"` and `\`, newline, carriage return and tab get their short escapes;
/// U+2028 / U+2029 and the remaining C0 controls are written as `\uXXXX`.
/// Everything else passes through. Returns the number of code points read.
pub fn escape<S, K>(src: &mut S, dst: &mut K) -> io::Result<usize>
where
    S: CharSource + ?Sized,
    K: CharSink + ?Sized,
{
    let mut count = 0;
    while let Some(c) = src.next_char()? {
        count += 1;
        match c {
            '"' => dst.put_str("\\\"")?,
            '\\' => dst.put_str("\\\\")?,
            '\n' => dst.put_str("\\n")?,
            '\r' => dst.put_str("\\r")?,
            '\t' => dst.put_str("\\t")?,
            '\u{2028}' => dst.put_str("\\u2028")?,
            '\u{2029}' => dst.put_str("\\u2029")?,
            c if c < ' ' => dst.put_str(&format!("\\u{:04x}", c as u32))?,
            c => dst.put_char(c)?,
        }
    }
    Ok(count)
}

/// Escape an in-memory string.
pub fn escape_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    // String sinks cannot fail.
    let _ = escape(&mut s.chars(), &mut out);
    out
}
