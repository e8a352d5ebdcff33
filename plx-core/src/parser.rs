//! Low-level field decoding for fixed-size PLX records.
//!
//! Every on-disk structure is decoded field by field from a little-endian
//! byte slice, so no struct layout or padding rules are involved.

use crate::types::{DataBlockHeader, DATA_BLOCK_HEADER_SIZE};
use byteorder::{ByteOrder, LittleEndian};
use std::io::{self, ErrorKind, Read};

/// Sequential little-endian reader over a fixed-size record.
///
/// Callers check the slice length against the record size before reading;
/// reading past the end panics.
pub(crate) struct FieldReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Number of bytes consumed so far.
    #[inline]
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    fn take(&mut self, len: usize) -> &'a [u8] {
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        slice
    }

    #[inline]
    pub(crate) fn skip(&mut self, len: usize) {
        self.pos += len;
    }

    #[inline]
    pub(crate) fn u8(&mut self) -> u8 {
        self.take(1)[0]
    }

    #[inline]
    pub(crate) fn u16(&mut self) -> u16 {
        LittleEndian::read_u16(self.take(2))
    }

    #[inline]
    pub(crate) fn i16(&mut self) -> i16 {
        LittleEndian::read_i16(self.take(2))
    }

    #[inline]
    pub(crate) fn u32(&mut self) -> u32 {
        LittleEndian::read_u32(self.take(4))
    }

    #[inline]
    pub(crate) fn i32(&mut self) -> i32 {
        LittleEndian::read_i32(self.take(4))
    }

    #[inline]
    pub(crate) fn f64(&mut self) -> f64 {
        LittleEndian::read_f64(self.take(8))
    }

    /// Reads a NUL-terminated character array of `len` bytes.
    pub(crate) fn fixed_str(&mut self, len: usize) -> String {
        let raw = self.take(len);
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        String::from_utf8_lossy(&raw[..end]).into_owned()
    }

    pub(crate) fn i32_array<const N: usize>(&mut self) -> [i32; N] {
        let mut out = [0i32; N];
        LittleEndian::read_i32_into(self.take(N * 4), &mut out);
        out
    }

    pub(crate) fn i16_array<const N: usize>(&mut self) -> [i16; N] {
        let mut out = [0i16; N];
        LittleEndian::read_i16_into(self.take(N * 2), &mut out);
        out
    }
}

/// Decodes a data block header from exactly [`DATA_BLOCK_HEADER_SIZE`] bytes.
pub fn parse_block_header(bytes: &[u8; DATA_BLOCK_HEADER_SIZE]) -> DataBlockHeader {
    let mut r = FieldReader::new(bytes);
    DataBlockHeader {
        block_type: r.i16(),
        timestamp_high: r.u16(),
        timestamp_low: r.u32(),
        channel: r.i16(),
        unit: r.i16(),
        waveform_count: r.i16(),
        words_per_waveform: r.i16(),
    }
}

/// Decodes a little-endian sample payload.
pub fn parse_samples(bytes: &[u8]) -> Vec<i16> {
    let mut samples = vec![0i16; bytes.len() / 2];
    LittleEndian::read_i16_into(&bytes[..samples.len() * 2], &mut samples);
    samples
}

/// Fills `buf` from `reader` until it is full or the source is exhausted.
///
/// Returns the number of bytes read, which is less than `buf.len()` only
/// at end of input.
pub fn read_up_to<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
