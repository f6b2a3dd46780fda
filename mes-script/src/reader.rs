use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Result, ScriptError};
use crate::opcode::{EXTRA_BLOCK_LEN, EXTRA_BLOCK_TAG};

/// Forward cursor over a borrowed byte buffer.
///
/// All reads are bounds checked and report the offset they failed at.
#[derive(Debug, Clone)]
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ScriptError::structural(
                self.pos,
                format!(
                    "unexpected end of data reading {} ({} bytes needed, {} left)",
                    what,
                    n,
                    self.remaining()
                ),
            ));
        }
        let s = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1, "u8")?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2, "u16")?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4, "u32")?))
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n, "operand").map(|_| ())
    }

    pub fn read_rest(&mut self) -> &'a [u8] {
        let s = &self.bytes[self.pos.min(self.bytes.len())..];
        self.pos = self.bytes.len();
        s
    }

    /// Read a NUL terminated byte string. The terminator is consumed but not returned.
    pub fn read_cstr(&mut self) -> Result<&'a [u8]> {
        let start = self.pos;
        let rest = &self.bytes[start.min(self.bytes.len())..];
        match rest.iter().position(|&b| b == 0) {
            Some(n) => {
                self.pos = start + n + 1;
                Ok(&rest[..n])
            }
            None => Err(ScriptError::structural(
                start,
                "unterminated string operand",
            )),
        }
    }

    /// Consume an optional extra parameter block.
    ///
    /// Reads the next byte; when it is the block tag the four 16-bit fields behind
    /// it are consumed as well. Any other byte is handed back by stepping the cursor
    /// back over it, so it is decoded again as the next opcode.
    pub fn try_read_extra_block(&mut self) -> Result<bool> {
        if self.is_at_end() {
            return Ok(false);
        }
        let tag = self.read_u8()?;
        if tag != EXTRA_BLOCK_TAG {
            self.pos -= 1;
            return Ok(false);
        }
        self.skip(EXTRA_BLOCK_LEN)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_block_rewinds_on_other_byte() {
        let mut r = ByteReader::new(&[0x10, 0x00]);
        assert!(!r.try_read_extra_block().unwrap());
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_u8().unwrap(), 0x10);
    }

    #[test]
    fn extra_block_consumed_on_tag() {
        let bytes = [0x77, 1, 0, 2, 0, 3, 0, 4, 0, 0x10];
        let mut r = ByteReader::new(&bytes);
        assert!(r.try_read_extra_block().unwrap());
        assert_eq!(r.position(), 9);
        assert_eq!(r.read_u8().unwrap(), 0x10);
    }

    #[test]
    fn extra_block_at_end_is_absent() {
        let mut r = ByteReader::new(&[]);
        assert!(!r.try_read_extra_block().unwrap());
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn truncated_extra_block_is_structural() {
        let mut r = ByteReader::new(&[0x77, 1, 0]);
        match r.try_read_extra_block() {
            Err(ScriptError::Structural { offset, .. }) => assert_eq!(offset, 1),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn cstr_consumes_terminator() {
        let mut r = ByteReader::new(b"abc\0d");
        assert_eq!(r.read_cstr().unwrap(), b"abc");
        assert_eq!(r.position(), 4);
        assert!(matches!(r.read_cstr(), Err(ScriptError::Structural { offset: 4, .. })));
    }

    #[test]
    fn reads_little_endian() {
        let mut r = ByteReader::new(&[0x34, 0x12, 0x78, 0x56, 0x34, 0x12]);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u32().unwrap(), 0x1234_5678);
        assert!(r.is_at_end());
        assert!(r.read_u8().unwrap_err().to_string().contains("u8"));
    }
}
