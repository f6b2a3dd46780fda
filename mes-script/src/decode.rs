use std::ops::Range;

use crate::container::JUMP_ADDRESS_MASK;
use crate::error::{Result, ScriptError};
use crate::opcode::{classify, InstKind, OperandShape, EXTRA_BLOCK_LEN, UNRELIABLE_OPCODE};
use crate::reader::ByteReader;

/// Size of the code-section prefix: version byte plus a 16-bit marker.
pub const CODE_PREFIX_LEN: usize = 3;
/// Marker value seen in every known script. Not enforced.
pub const USUAL_MARKER: u16 = 0x00AB;

const EXTRA_BLOCK_SIZE: u32 = 1 + EXTRA_BLOCK_LEN as u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodePrefix {
    pub version: u8,
    pub marker: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Offset of the opcode byte within the code section.
    pub address: u32,
    /// Opcode, operand and optional extra block.
    pub length: u32,
    pub kind: InstKind,
    pub opcode: u8,
    pub has_extra: bool,
}

impl Instruction {
    #[inline]
    pub fn end(&self) -> u32 {
        self.address + self.length
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.address as usize..self.end() as usize
    }

    /// Byte range of the encrypted text of a string load, without opcode,
    /// terminator or extra block. `None` for other kinds and for empty strings.
    pub fn string_payload(&self) -> Option<Range<usize>> {
        if self.kind != InstKind::StringLoad {
            return None;
        }
        let extra = if self.has_extra { EXTRA_BLOCK_SIZE } else { 0 };
        let start = self.address as usize + 1;
        let end = (self.end() - extra) as usize - 1;
        (end > start).then_some(start..end)
    }

    /// Bytes following the string terminator, i.e. the extra block if any.
    pub fn trailer(&self) -> Range<usize> {
        let extra = if self.has_extra { EXTRA_BLOCK_SIZE } else { 0 };
        (self.end() - extra) as usize..self.end() as usize
    }
}

/// Ordered, contiguous instruction list of one code section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    prefix: CodePrefix,
    instructions: Vec<Instruction>,
}

impl Assembly {
    pub fn prefix(&self) -> CodePrefix {
        self.prefix
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn string_loads(&self) -> impl Iterator<Item = &Instruction> + '_ {
        self.instructions
            .iter()
            .filter(|i| i.kind == InstKind::StringLoad)
    }

    /// Sum of instruction lengths.
    pub fn byte_len(&self) -> usize {
        self.instructions.iter().map(|i| i.length as usize).sum()
    }

    /// Instruction starting exactly at `address`.
    pub fn find(&self, address: u32) -> Option<(usize, &Instruction)> {
        self.instructions
            .binary_search_by_key(&address, |i| i.address)
            .ok()
            .map(|idx| (idx, &self.instructions[idx]))
    }
}

fn decode_one(rdr: &mut ByteReader<'_>) -> Result<Instruction> {
    let address = rdr.position();
    let opcode = rdr.read_u8()?;

    if opcode == UNRELIABLE_OPCODE {
        log::trace!("opcode 0x{:02X} at 0x{:08X}", opcode, address);
    }

    let (shape, kind) = classify(opcode);
    match shape {
        OperandShape::Fixed2 => rdr.skip(2)?,
        OperandShape::ByteThenCString => {
            rdr.skip(1)?;
            rdr.read_cstr()?;
        }
        OperandShape::CString => {
            rdr.read_cstr()?;
        }
        OperandShape::Fixed8 => rdr.skip(8)?,
    }

    let has_extra = rdr.try_read_extra_block()?;

    Ok(Instruction {
        address: address as u32,
        length: (rdr.position() - address) as u32,
        kind,
        opcode,
        has_extra,
    })
}

/// Segment a code section into instructions.
pub fn decode_assembly(code: &[u8]) -> Result<Assembly> {
    if code.len() > JUMP_ADDRESS_MASK as usize {
        return Err(ScriptError::structural(
            0,
            format!("code section too large: {} bytes", code.len()),
        ));
    }

    let mut rdr = ByteReader::new(code);
    let version = rdr.read_u8()?;
    let marker = rdr.read_u16()?;
    log::debug!("code prefix: version={} marker=0x{:04X}", version, marker);
    if marker != USUAL_MARKER {
        log::warn!(
            "unusual code marker 0x{:04X} (expected 0x{:04X})",
            marker,
            USUAL_MARKER
        );
    }

    let mut instructions = Vec::new();
    while !rdr.is_at_end() {
        instructions.push(decode_one(&mut rdr)?);
    }

    let asm = Assembly {
        prefix: CodePrefix { version, marker },
        instructions,
    };

    if asm.byte_len() != code.len() - CODE_PREFIX_LEN {
        return Err(ScriptError::structural(
            code.len(),
            format!(
                "parse length mismatch: decoded {} bytes, expected {}",
                asm.byte_len(),
                code.len() - CODE_PREFIX_LEN
            ),
        ));
    }

    log::debug!(
        "decoded {} instructions, {} string loads",
        asm.len(),
        asm.string_loads().count()
    );
    Ok(asm)
}
