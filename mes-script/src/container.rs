use std::fmt;

use crate::error::{Result, ScriptError};
use crate::reader::ByteReader;

/// Bit 31 of a jump entry, carried through untouched.
pub const JUMP_FLAG: u32 = 0x8000_0000;
/// Bits 0..=30 of a jump entry: a byte offset into the code section.
pub const JUMP_ADDRESS_MASK: u32 = 0x7FFF_FFFF;

const COUNT_SIZE: usize = 4;
const JUMP_ENTRY_SIZE: usize = 4;
const AUX_VALUE_SIZE: usize = 2;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct JumpEntry(u32);

impl JumpEntry {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn flag(self) -> bool {
        self.0 & JUMP_FLAG != 0
    }

    /// Code-section offset this entry refers to.
    #[inline]
    pub fn target(self) -> u32 {
        self.0 & JUMP_ADDRESS_MASK
    }

    /// Same flag, new target. Bits of `target` above bit 30 are discarded.
    #[inline]
    pub fn with_target(self, target: u32) -> Self {
        Self((self.0 & JUMP_FLAG) | (target & JUMP_ADDRESS_MASK))
    }
}

impl fmt::Debug for JumpEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JumpEntry(0x{:08X})", self.0)
    }
}

/// In-memory form of a script file.
///
/// Layout (little-endian):
/// - u32 count
/// - count x u32 jump entries
/// - count x u16 auxiliary values
/// - code section up to EOF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    jump_table: Vec<JumpEntry>,
    aux: Vec<u16>,
    code: Vec<u8>,
}

impl Container {
    pub fn new(jump_table: Vec<JumpEntry>, aux: Vec<u16>, code: Vec<u8>) -> Result<Self> {
        if jump_table.len() != aux.len() {
            return Err(ScriptError::structural(
                0,
                format!(
                    "jump table has {} entries but auxiliary table has {}",
                    jump_table.len(),
                    aux.len()
                ),
            ));
        }
        Ok(Self {
            jump_table,
            aux,
            code,
        })
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut rdr = ByteReader::new(bytes);

        let count = rdr.read_u32()? as usize;
        let needed = count
            .checked_mul(JUMP_ENTRY_SIZE + AUX_VALUE_SIZE)
            .filter(|&n| n <= rdr.remaining())
            .ok_or_else(|| {
                ScriptError::structural(
                    COUNT_SIZE,
                    format!(
                        "declared {} table entries do not fit in the remaining {} bytes",
                        count,
                        rdr.remaining()
                    ),
                )
            })?;
        log::trace!("container: {} table entries ({} bytes)", count, needed);

        let mut jump_table = Vec::with_capacity(count);
        for _ in 0..count {
            jump_table.push(JumpEntry::new(rdr.read_u32()?));
        }

        let mut aux = Vec::with_capacity(count);
        for _ in 0..count {
            aux.push(rdr.read_u16()?);
        }

        let code = rdr.read_rest().to_vec();

        Ok(Self {
            jump_table,
            aux,
            code,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            COUNT_SIZE
                + self.jump_table.len() * (JUMP_ENTRY_SIZE + AUX_VALUE_SIZE)
                + self.code.len(),
        );

        out.extend_from_slice(&(self.jump_table.len() as u32).to_le_bytes());
        for e in &self.jump_table {
            out.extend_from_slice(&e.raw().to_le_bytes());
        }
        for v in &self.aux {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&self.code);

        out
    }

    pub fn jump_table(&self) -> &[JumpEntry] {
        &self.jump_table
    }

    pub fn aux(&self) -> &[u16] {
        &self.aux
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Swap in a rebuilt code section and its patched jump table.
    pub(crate) fn replace_code(&mut self, jump_table: Vec<JumpEntry>, code: Vec<u8>) {
        debug_assert_eq!(jump_table.len(), self.aux.len());
        self.jump_table = jump_table;
        self.code = code;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_bytes() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&2u32.to_le_bytes());
        b.extend_from_slice(&0x8000_0003u32.to_le_bytes());
        b.extend_from_slice(&0x0000_0006u32.to_le_bytes());
        b.extend_from_slice(&0xABCDu16.to_le_bytes());
        b.extend_from_slice(&0x0001u16.to_le_bytes());
        b.extend_from_slice(&[0x01, 0xAB, 0x00, 0x10, 0x00, 0x00]);
        b
    }

    #[test]
    fn parse_layout() {
        let c = Container::parse(&sample_bytes()).unwrap();
        assert_eq!(
            c.jump_table(),
            &[JumpEntry::new(0x8000_0003), JumpEntry::new(6)]
        );
        assert_eq!(c.aux(), &[0xABCD, 0x0001]);
        assert_eq!(c.code(), &[0x01, 0xAB, 0x00, 0x10, 0x00, 0x00]);
    }

    #[test]
    fn write_is_inverse_of_parse() {
        let bytes = sample_bytes();
        let c = Container::parse(&bytes).unwrap();
        assert_eq!(c.to_bytes(), bytes);
    }

    #[test]
    fn oversized_count_is_structural() {
        let mut b = Vec::new();
        b.extend_from_slice(&100u32.to_le_bytes());
        b.extend_from_slice(&[0u8; 12]);
        match Container::parse(&b) {
            Err(ScriptError::Structural { offset, reason }) => {
                assert_eq!(offset, 4);
                assert!(reason.contains("100"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn huge_count_does_not_overflow() {
        let b = u32::MAX.to_le_bytes();
        assert!(matches!(
            Container::parse(&b),
            Err(ScriptError::Structural { .. })
        ));
    }

    #[test]
    fn truncated_header_is_structural() {
        assert!(matches!(
            Container::parse(&[0x01, 0x00]),
            Err(ScriptError::Structural { offset: 0, .. })
        ));
    }

    #[test]
    fn table_lengths_must_match() {
        assert!(Container::new(vec![JumpEntry::new(3)], vec![], vec![]).is_err());
    }

    #[test]
    fn jump_entry_bits() {
        let e = JumpEntry::new(0x8000_0010);
        assert!(e.flag());
        assert_eq!(e.target(), 0x10);
        let moved = e.with_target(0x20);
        assert_eq!(moved.raw(), 0x8000_0020);

        let plain = JumpEntry::new(0x10).with_target(0xFFFF_FFFF);
        assert!(!plain.flag());
        assert_eq!(plain.target(), JUMP_ADDRESS_MASK);
    }
}
