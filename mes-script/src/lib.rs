//! mes-script
//!
//! Decoder and relocator for MES script containers.
//!
//! A container holds a jump-address table, an opaque auxiliary table and a code
//! section. The code section is segmented into instructions by opcode range; the
//! string-load instructions carry lightly encrypted dialogue that can be exported
//! for translation and written back. Reinsertion rebuilds the code section and
//! patches the jump table so control flow still lands on the moved instructions.

pub mod container;
pub mod crypt;
pub mod decode;
pub mod error;
pub mod opcode;
mod reader;
pub mod relocate;
pub mod script;
pub mod text;

pub use container::{Container, JumpEntry};
pub use decode::{decode_assembly, Assembly, CodePrefix, Instruction};
pub use error::{Result, ScriptError};
pub use mes_nls::{Codec, Encoding, EncodingError};
pub use opcode::{InstKind, OperandShape};
pub use relocate::{relocate, Relocated, RelocationReport};
pub use script::Script;
pub use text::{parse_translations, TextArtifact, TextUnit, TranslationMap};
