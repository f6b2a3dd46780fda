//! Byte transform applied to the text of string-load instructions.
//!
//! Stored bytes are plain bytes shifted down by 0x20. Spaces are stored as
//! `'$' - 0x20`, so the transform is not a bijection: `'$'` and `' '` encrypt to
//! the same stored byte, which always decrypts to a space. Stored 0x00 (never
//! seen inside a payload, it is the terminator) also decrypts to a space.

const SHIFT: u8 = 0x20;
const SPACE: u8 = 0x20;
const SPACE_STAND_IN: u8 = 0x24;

#[inline]
pub fn decrypt_byte(b: u8) -> u8 {
    match b.wrapping_add(SHIFT) {
        SPACE_STAND_IN => SPACE,
        p => p,
    }
}

#[inline]
pub fn encrypt_byte(b: u8) -> u8 {
    let b = if b == SPACE { SPACE_STAND_IN } else { b };
    b.wrapping_sub(SHIFT)
}

pub fn decrypt(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().map(|&b| decrypt_byte(b)).collect()
}

pub fn encrypt(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().map(|&b| encrypt_byte(b)).collect()
}
