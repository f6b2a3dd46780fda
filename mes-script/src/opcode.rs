//! Opcode classification.
//!
//! Only the operand *shape* of an instruction is known, keyed by the range its
//! opcode byte falls in. Revisions of the engine that move these boundaries only
//! need the constants below changed.

/// First opcode taking a one-byte operand followed by a string.
pub const PREFIXED_STRING_FIRST: u8 = 0x3B;
/// First opcode taking a bare string operand.
pub const STRING_FIRST: u8 = 0x48;
/// First opcode loading an encrypted dialogue string.
pub const STRING_LOAD_FIRST: u8 = 0x69;
/// First opcode taking four 16-bit operands.
pub const WIDE_FIRST: u8 = 0x6E;

/// Tag byte announcing an optional extra parameter block after an operand.
pub const EXTRA_BLOCK_TAG: u8 = 0x77;
/// Size of the extra parameter block after its tag byte (four 16-bit fields).
pub const EXTRA_BLOCK_LEN: usize = 8;

/// Opcode not known to fit the range table. It decodes as a wide instruction.
pub const UNRELIABLE_OPCODE: u8 = 0x87;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandShape {
    /// Two fixed bytes.
    Fixed2,
    /// One byte, then a NUL terminated string.
    ByteThenCString,
    /// A NUL terminated string.
    CString,
    /// Four 16-bit fields.
    Fixed8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstKind {
    #[default]
    Unknown,
    StringLoad,
}

pub fn classify(opcode: u8) -> (OperandShape, InstKind) {
    match opcode {
        c if c < PREFIXED_STRING_FIRST => (OperandShape::Fixed2, InstKind::Unknown),
        c if c < STRING_FIRST => (OperandShape::ByteThenCString, InstKind::Unknown),
        c if c < STRING_LOAD_FIRST => (OperandShape::CString, InstKind::Unknown),
        c if c < WIDE_FIRST => (OperandShape::CString, InstKind::StringLoad),
        _ => (OperandShape::Fixed8, InstKind::Unknown),
    }
}
