//! Little-endian byte cursor over an immutable buffer.

use picotttr_core::{Error, Result};

/// Forward-only reader over a byte slice.
///
/// Every read either returns the full value or fails with
/// [`Error::TruncatedStream`] without moving the cursor.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Creates a cursor at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Takes the next `len` bytes.
    ///
    /// # Errors
    /// Returns [`Error::TruncatedStream`] if fewer than `len` bytes remain.
    pub fn take(&mut self, len: usize, context: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::truncated(context, len, self.remaining()));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Skips `len` bytes.
    ///
    /// # Errors
    /// Returns [`Error::TruncatedStream`] if fewer than `len` bytes remain.
    pub fn skip(&mut self, len: usize, context: &'static str) -> Result<()> {
        self.take(len, context).map(|_| ())
    }

    fn array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, context)?);
        Ok(out)
    }

    /// Reads an `i32`.
    ///
    /// # Errors
    /// Returns [`Error::TruncatedStream`] on a short buffer.
    pub fn read_i32(&mut self, context: &'static str) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array(context)?))
    }

    /// Reads a `u32`.
    ///
    /// # Errors
    /// Returns [`Error::TruncatedStream`] on a short buffer.
    pub fn read_u32(&mut self, context: &'static str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array(context)?))
    }

    /// Reads an `i64`.
    ///
    /// # Errors
    /// Returns [`Error::TruncatedStream`] on a short buffer.
    pub fn read_i64(&mut self, context: &'static str) -> Result<i64> {
        Ok(i64::from_le_bytes(self.array(context)?))
    }

    /// Reads an `f32`.
    ///
    /// # Errors
    /// Returns [`Error::TruncatedStream`] on a short buffer.
    pub fn read_f32(&mut self, context: &'static str) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array(context)?))
    }

    /// Reads an `f64`.
    ///
    /// # Errors
    /// Returns [`Error::TruncatedStream`] on a short buffer.
    pub fn read_f64(&mut self, context: &'static str) -> Result<f64> {
        Ok(f64::from_le_bytes(self.array(context)?))
    }

    /// Reads a fixed-width ASCII field, dropping trailing NUL and space
    /// padding.
    ///
    /// # Errors
    /// Returns [`Error::TruncatedStream`] on a short buffer.
    pub fn read_padded_str(&mut self, len: usize, context: &'static str) -> Result<String> {
        let bytes = self.take(len, context)?;
        Ok(trim_padding(bytes))
    }
}

/// Decodes a padded name/ident field.
///
/// Content stops at the first NUL; trailing spaces are dropped.
pub(crate) fn trim_padding(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end])
        .trim_end_matches(' ')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_reads() {
        let mut data = Vec::new();
        data.extend_from_slice(&(-1i32).to_le_bytes());
        data.extend_from_slice(&42i64.to_le_bytes());
        data.extend_from_slice(&1.5f64.to_le_bytes());

        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_i32("idx").unwrap(), -1);
        assert_eq!(cursor.read_i64("val").unwrap(), 42);
        assert!((cursor.read_f64("val").unwrap() - 1.5).abs() < f64::EPSILON);
        assert_eq!(cursor.remaining(), 0);
        assert_eq!(cursor.position(), 20);
    }

    #[test]
    fn test_cursor_truncated_does_not_advance() {
        let data = [1u8, 2, 3];
        let mut cursor = ByteCursor::new(&data);
        let err = cursor.read_u32("record").unwrap_err();
        assert!(matches!(
            err,
            Error::TruncatedStream {
                needed: 4,
                available: 3,
                ..
            }
        ));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_trim_padding() {
        assert_eq!(trim_padding(b"PQTTTR\0\0"), "PQTTTR");
        assert_eq!(trim_padding(b"ImgHdr_PixX   "), "ImgHdr_PixX");
        assert_eq!(trim_padding(b"\0garbage"), "");
    }
}
