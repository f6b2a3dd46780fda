use std::io::Write;

use anyhow::Result;
use mes_nls::Codec;
use mes_script::{crypt, InstKind, Instruction, Script};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Listing {
    version: u8,
    marker: u16,
    code_size: usize,
    jumps: Vec<Jump>,
    insts: Vec<Inst>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Jump {
    index: usize,
    target: u32,
    flag: bool,
    aux: u16,
    /// Whether the target is the start of an instruction.
    resolved: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Inst {
    address: u32,
    length: u32,
    opcode: String,
    kind: String,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    extra: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    text: Option<String>,
}

impl Inst {
    fn from_instruction(inst: &Instruction, code: &[u8], codec: &Codec) -> Self {
        let text = inst.string_payload().and_then(|payload| {
            match codec.decode(&crypt::decrypt(&code[payload])) {
                Ok(s) => Some(s),
                Err(e) => {
                    log::warn!("0x{:08X}: {}", inst.address, e);
                    None
                }
            }
        });

        Self {
            address: inst.address,
            length: inst.length,
            opcode: format!("0x{:02X}", inst.opcode),
            kind: match inst.kind {
                InstKind::Unknown => "unknown".to_string(),
                InstKind::StringLoad => "string_load".to_string(),
            },
            extra: inst.has_extra,
            text,
        }
    }
}

impl Listing {
    pub fn new(script: &Script, codec: &Codec) -> Self {
        let container = script.container();
        let asm = script.assembly();

        let jumps = container
            .jump_table()
            .iter()
            .zip(container.aux())
            .enumerate()
            .map(|(index, (entry, &aux))| Jump {
                index,
                target: entry.target(),
                flag: entry.flag(),
                aux,
                resolved: asm.find(entry.target()).is_some(),
            })
            .collect();

        let insts = asm
            .instructions()
            .iter()
            .map(|i| Inst::from_instruction(i, container.code(), codec))
            .collect();

        Self {
            version: asm.prefix().version,
            marker: asm.prefix().marker,
            code_size: container.code().len(),
            jumps,
            insts,
        }
    }

    pub fn write<W: Write>(&self, writer: W) -> Result<()> {
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}
