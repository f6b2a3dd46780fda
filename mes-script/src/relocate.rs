use mes_nls::Codec;

use crate::container::{Container, JumpEntry, JUMP_ADDRESS_MASK};
use crate::crypt;
use crate::decode::{Assembly, CODE_PREFIX_LEN};
use crate::error::{Result, ScriptError};
use crate::opcode::InstKind;
use crate::text::TranslationMap;

/// What a relocation did besides producing bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocationReport {
    /// String loads rewritten from the translation map.
    pub translated: usize,
    /// Translation keys that are not the address of any string load.
    pub ignored_addresses: Vec<u32>,
    /// Jump entries that pointed at an instruction and now follow it.
    pub patched_entries: usize,
    /// Indices of jump entries that matched no instruction and were left as is.
    pub unmatched_entries: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Relocated {
    pub code: Vec<u8>,
    pub jump_table: Vec<JumpEntry>,
    pub report: RelocationReport,
}

/// Rebuild the code section with translated strings and patch the jump table.
///
/// Instructions are replayed in order. Translated string loads are re-emitted as
/// opcode, encrypted text, terminator and any extra block they carried; every
/// other instruction is copied verbatim. Jump entries whose target is the
/// original address of an instruction are moved to that instruction's new
/// offset, keeping their flag bit.
pub fn relocate(
    container: &Container,
    asm: &Assembly,
    translations: &TranslationMap,
    codec: &Codec,
) -> Result<Relocated> {
    let old = container.code();
    let mut report = RelocationReport::default();

    for &address in translations.keys() {
        match asm.find(address) {
            Some((_, inst)) if inst.kind == InstKind::StringLoad => {}
            _ => {
                log::warn!(
                    "no string load at {:08X}, translation ignored",
                    address
                );
                report.ignored_addresses.push(address);
            }
        }
    }

    let mut code: Vec<u8> = Vec::with_capacity(old.len());
    code.extend_from_slice(&old[..CODE_PREFIX_LEN]);

    let mut new_addrs: Vec<u32> = Vec::with_capacity(asm.len());
    for inst in asm.instructions() {
        new_addrs.push(checked_address(code.len())?);

        let text = match inst.kind {
            InstKind::StringLoad => translations.get(&inst.address),
            InstKind::Unknown => None,
        };

        match text {
            Some(text) => {
                let plain = codec.encode(text)?;
                code.push(inst.opcode);
                code.extend_from_slice(&crypt::encrypt(&plain));
                code.push(0);
                code.extend_from_slice(&old[inst.trailer()]);
                report.translated += 1;
            }
            None => code.extend_from_slice(&old[inst.range()]),
        }
    }
    checked_address(code.len())?;

    let mut jump_table = Vec::with_capacity(container.jump_table().len());
    for (idx, &entry) in container.jump_table().iter().enumerate() {
        match asm.find(entry.target()) {
            Some((i, _)) => {
                jump_table.push(entry.with_target(new_addrs[i]));
                report.patched_entries += 1;
            }
            None => {
                jump_table.push(entry);
                report.unmatched_entries.push(idx);
            }
        }
    }

    if !report.unmatched_entries.is_empty() {
        log::debug!(
            "{} jump entries match no instruction and were left unchanged",
            report.unmatched_entries.len()
        );
    }
    log::debug!(
        "relocated: {} strings replaced, code {} -> {} bytes",
        report.translated,
        old.len(),
        code.len()
    );

    Ok(Relocated {
        code,
        jump_table,
        report,
    })
}

fn checked_address(offset: usize) -> Result<u32> {
    if offset > JUMP_ADDRESS_MASK as usize {
        return Err(ScriptError::structural(
            offset,
            "rebuilt code section exceeds the 31-bit jump address range",
        ));
    }
    Ok(offset as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_assembly;
    use mes_nls::Encoding;
    use pretty_assertions::assert_eq;

    fn container(jumps: &[u32], code: &[u8]) -> Container {
        Container::new(
            jumps.iter().copied().map(JumpEntry::new).collect(),
            vec![0; jumps.len()],
            code.to_vec(),
        )
        .unwrap()
    }

    fn sjis() -> Codec {
        Codec::new(Encoding::ShiftJis)
    }

    // 3: 6B "Hi" 00        (string load, len 4)
    // 7: 10 AA BB          (fixed 2, len 3)
    // 10: 6C "Yo" 00       (string load, len 4)
    // 14: 80 x8            (fixed 8, len 9)
    fn sample_code() -> Vec<u8> {
        let mut v = vec![0x01, 0xAB, 0x00];
        v.push(0x6B);
        v.extend(crypt::encrypt(b"Hi"));
        v.push(0x00);
        v.extend([0x10, 0xAA, 0xBB]);
        v.push(0x6C);
        v.extend(crypt::encrypt(b"Yo"));
        v.push(0x00);
        v.extend([0x80, 1, 2, 3, 4, 5, 6, 7, 8]);
        v
    }

    #[test]
    fn no_translations_is_identity() {
        let c = container(&[3, 0x8000_000A], &sample_code());
        let asm = decode_assembly(c.code()).unwrap();
        let out = relocate(&c, &asm, &TranslationMap::new(), &sjis()).unwrap();
        assert_eq!(out.code, c.code());
        assert_eq!(out.jump_table, c.jump_table());
        assert_eq!(out.report.translated, 0);
        assert_eq!(out.report.patched_entries, 2);
    }

    #[test]
    fn longer_string_moves_later_targets() {
        let c = container(&[3, 7, 0x8000_000A, 14], &sample_code());
        let asm = decode_assembly(c.code()).unwrap();
        let mut map = TranslationMap::new();
        map.insert(3, "Hello".to_string());

        let out = relocate(&c, &asm, &map, &sjis()).unwrap();

        let targets: Vec<u32> = out.jump_table.iter().map(|e| e.raw()).collect();
        assert_eq!(targets, vec![3, 10, 0x8000_000D, 17]);
        assert_eq!(out.code.len(), c.code().len() + 3);
        assert_eq!(&out.code[3..10], &[0x6B, 0x28, 0x45, 0x4C, 0x4C, 0x4F, 0x00]);
        assert_eq!(&out.code[10..], &c.code()[7..]);
        assert_eq!(out.report.translated, 1);
    }

    #[test]
    fn shorter_string_moves_targets_back() {
        let c = container(&[0x8000_000E], &sample_code());
        let asm = decode_assembly(c.code()).unwrap();
        let mut map = TranslationMap::new();
        map.insert(10, String::new());

        let out = relocate(&c, &asm, &map, &sjis()).unwrap();
        assert_eq!(out.jump_table[0].raw(), 0x8000_000C);
        assert!(out.jump_table[0].flag());
        assert_eq!(&out.code[10..12], &[0x6C, 0x00]);
        decode_assembly(&out.code).unwrap();
    }

    #[test]
    fn unknown_addresses_are_reported_not_applied() {
        let c = container(&[], &sample_code());
        let asm = decode_assembly(c.code()).unwrap();
        let mut map = TranslationMap::new();
        map.insert(7, "not a string".to_string());
        map.insert(0x1000, "nowhere".to_string());

        let out = relocate(&c, &asm, &map, &sjis()).unwrap();
        assert_eq!(out.code, c.code());
        assert_eq!(out.report.ignored_addresses, vec![7, 0x1000]);
        assert_eq!(out.report.translated, 0);
    }

    #[test]
    fn unmatched_jump_entries_are_untouched() {
        // 5 is inside the first string, 0 is inside the prefix, 23 is the end.
        let c = container(&[5, 0x8000_0000, 23, 7], &sample_code());
        let asm = decode_assembly(c.code()).unwrap();
        let mut map = TranslationMap::new();
        map.insert(3, "Hello".to_string());

        let out = relocate(&c, &asm, &map, &sjis()).unwrap();
        let raw: Vec<u32> = out.jump_table.iter().map(|e| e.raw()).collect();
        assert_eq!(raw, vec![5, 0x8000_0000, 23, 10]);
        assert_eq!(out.report.unmatched_entries, vec![0, 1, 2]);
        assert_eq!(out.report.patched_entries, 1);
    }

    #[test]
    fn extra_block_is_carried_over() {
        let mut code = vec![0x01, 0xAB, 0x00, 0x69];
        code.extend(crypt::encrypt(b"A"));
        code.extend([0x00, 0x77, 1, 0, 2, 0, 3, 0, 4, 0]);
        code.extend([0x10, 0, 0]);
        let c = container(&[15], &code);
        let asm = decode_assembly(c.code()).unwrap();
        let mut map = TranslationMap::new();
        map.insert(3, "ABC".to_string());

        let out = relocate(&c, &asm, &map, &sjis()).unwrap();
        assert_eq!(
            &out.code[3..],
            &[0x69, 0x21, 0x22, 0x23, 0x00, 0x77, 1, 0, 2, 0, 3, 0, 4, 0, 0x10, 0, 0]
        );
        assert_eq!(out.jump_table[0].raw(), 17);
        let again = decode_assembly(&out.code).unwrap();
        assert!(again.instructions()[0].has_extra);
    }

    #[test]
    fn every_entry_for_a_target_is_patched() {
        let c = container(&[10, 0x8000_000A], &sample_code());
        let asm = decode_assembly(c.code()).unwrap();
        let mut map = TranslationMap::new();
        map.insert(3, "Hey!".to_string());

        let out = relocate(&c, &asm, &map, &sjis()).unwrap();
        let raw: Vec<u32> = out.jump_table.iter().map(|e| e.raw()).collect();
        assert_eq!(raw, vec![12, 0x8000_000C]);
    }

    #[test]
    fn unencodable_text_fails() {
        let c = container(&[], &sample_code());
        let asm = decode_assembly(c.code()).unwrap();
        let mut map = TranslationMap::new();
        map.insert(3, "😀".to_string());
        assert!(matches!(
            relocate(&c, &asm, &map, &sjis()),
            Err(ScriptError::Encoding(_))
        ));
    }
}
