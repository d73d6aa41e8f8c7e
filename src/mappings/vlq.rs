// Base64 VLQ integer encoding (source map revision 3).
//
// The sign is moved into the least-significant bit of the magnitude, then the
// value is split into 5-bit groups, least-significant group first. Every group
// except the last carries the continuation bit (32). Each resulting 6-bit
// digit is written as one symbol of the standard base64 alphabet.

use std::io::{self, Write};

/// Maximum encoded length for an `i64` (65 significant bits / 5 = 13).
pub const MAX_VLQ_LEN: usize = 13;

/// Standard base64 alphabet; digit `n` is written as `BASE64_ALPHABET[n]`.
pub const BASE64_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const VLQ_SHIFT: u32 = 5;
const VLQ_MASK: u8 = 0x1F;
const VLQ_CONTINUATION: u8 = 0x20;

/// Past this shift the accumulator no longer fits a signed 64-bit result.
const MAX_SHIFT: u32 = 60;

const INVALID_SYMBOL: u8 = 0xFF;

static DECODE_TABLE: [u8; 256] = build_decode_table();

const fn build_decode_table() -> [u8; 256] {
    let mut table = [INVALID_SYMBOL; 256];
    let mut i = 0;
    while i < BASE64_ALPHABET.len() {
        table[BASE64_ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode an `i64` as base64 VLQ symbols into `buf`.
/// Returns the number of symbols written (1..=13), stored at `buf[..len]`.
#[inline]
pub fn encode_i64(num: i64, buf: &mut [u8; MAX_VLQ_LEN]) -> usize {
    let mut value = (u128::from(num.unsigned_abs()) << 1) | u128::from(num < 0);
    let mut len = 0;
    loop {
        let mut digit = (value as u8) & VLQ_MASK;
        value >>= VLQ_SHIFT;
        if value != 0 {
            digit |= VLQ_CONTINUATION;
        }
        buf[len] = BASE64_ALPHABET[digit as usize];
        len += 1;
        if value == 0 {
            return len;
        }
    }
}

/// Append the encoding of `num` to a string buffer.
pub fn push_i64(out: &mut String, num: i64) {
    let mut buf = [0u8; MAX_VLQ_LEN];
    let len = encode_i64(num, &mut buf);
    out.extend(buf[..len].iter().map(|&b| char::from(b)));
}

/// Encode an `i64` and write it to a `Write` sink.
pub fn write_i64<W: Write>(w: &mut W, num: i64) -> io::Result<()> {
    let mut buf = [0u8; MAX_VLQ_LEN];
    let len = encode_i64(num, &mut buf);
    w.write_all(&buf[..len])
}

/// Encoded symbol count for `num`.
#[inline]
pub fn sizeof_i64(num: i64) -> usize {
    let value = (u128::from(num.unsigned_abs()) << 1) | u128::from(num < 0);
    let bits = 128 - value.leading_zeros();
    bits.max(1).div_ceil(VLQ_SHIFT) as usize
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode one value from the front of `data`.
/// Returns `(value, symbols_consumed)`.
pub fn read_i64(data: &[u8]) -> Result<(i64, usize), VlqError> {
    if data.is_empty() {
        return Err(VlqError::Empty);
    }

    let mut acc: u128 = 0;
    let mut shift = 0u32;
    let mut overflow = false;
    for (i, &symbol) in data.iter().enumerate() {
        let digit = DECODE_TABLE[symbol as usize];
        if digit == INVALID_SYMBOL {
            return Err(VlqError::InvalidSymbol { symbol, offset: i });
        }
        if shift > MAX_SHIFT {
            overflow = true;
        } else {
            acc |= u128::from(digit & VLQ_MASK) << shift;
        }
        shift += VLQ_SHIFT;

        if digit & VLQ_CONTINUATION == 0 {
            if overflow {
                return Err(VlqError::Overflow { len: i + 1 });
            }
            let magnitude = (acc >> 1) as i128;
            let signed = if acc & 1 == 1 { -magnitude } else { magnitude };
            return i64::try_from(signed)
                .map(|v| (v, i + 1))
                .map_err(|_| VlqError::Overflow { len: i + 1 });
        }
    }
    Err(VlqError::Truncated)
}

/// Sequential reader over the symbols of one segment token.
///
/// A failed read still advances past the symbols that belonged to the
/// broken value, so later fields stay aligned.
#[derive(Debug, Clone)]
pub struct VlqReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> VlqReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Decode the next value.
    pub fn next_value(&mut self) -> Result<i64, VlqError> {
        let rest = &self.data[self.pos..];
        match read_i64(rest) {
            Ok((value, consumed)) => {
                self.pos += consumed;
                Ok(value)
            }
            Err(e) => {
                self.pos += e.consumed(rest.len());
                Err(e)
            }
        }
    }

    /// True once every symbol has been consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// A symbol run that did not decode to a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VlqError {
    /// No symbols left.
    #[error("no VLQ symbols to decode")]
    Empty,
    /// Input ended while the continuation bit was still set.
    #[error("VLQ truncated (continuation bit set on final symbol)")]
    Truncated,
    /// A byte outside the base64 alphabet.
    #[error("invalid base64 VLQ symbol {symbol:#04x} at offset {offset}")]
    InvalidSymbol { symbol: u8, offset: usize },
    /// Value does not fit in an `i64`.
    #[error("VLQ value overflows i64 ({len} symbols)")]
    Overflow { len: usize },
}

impl VlqError {
    /// Symbols swallowed by the failed value, out of `available`.
    pub fn consumed(&self, available: usize) -> usize {
        match *self {
            VlqError::Empty => 0,
            VlqError::Truncated => available,
            VlqError::InvalidSymbol { offset, .. } => offset + 1,
            VlqError::Overflow { len } => len,
        }
    }
}

impl From<VlqError> for io::Error {
    fn from(e: VlqError) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidData, e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
