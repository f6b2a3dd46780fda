use mes_nls::Codec;

use crate::container::Container;
use crate::crypt;
use crate::decode::{decode_assembly, Assembly};
use crate::error::Result;
use crate::relocate::{relocate, RelocationReport};
use crate::text::{parse_translations, TextArtifact, TextUnit, TranslationMap};

/// A loaded script: the container and its decoded instruction list.
#[derive(Debug, Clone)]
pub struct Script {
    container: Container,
    assembly: Assembly,
}

impl Script {
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let container = Container::parse(bytes)?;
        let assembly = decode_assembly(container.code())?;
        Ok(Self {
            container,
            assembly,
        })
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn assembly(&self) -> &Assembly {
        &self.assembly
    }

    /// Decrypt and decode every non-empty string load.
    pub fn export_text(&self, codec: &Codec) -> Result<TextArtifact> {
        let code = self.container.code();
        let mut units = Vec::new();

        for inst in self.assembly.string_loads() {
            let Some(payload) = inst.string_payload() else {
                continue;
            };
            let plain = crypt::decrypt(&code[payload]);
            let text = codec.decode(&plain)?;
            units.push(TextUnit {
                address: inst.address,
                text,
            });
        }

        Ok(TextArtifact::new(units))
    }

    /// Read an edited artifact back and rebuild the script with its text.
    pub fn import_and_relocate(&mut self, text: &str, codec: &Codec) -> Result<RelocationReport> {
        let translations = parse_translations(text)?;
        self.apply_translations(&translations, codec)
    }

    /// Rebuild the code section with `translations` and patch the jump table.
    ///
    /// `self` is only changed when the rebuilt code section decodes cleanly.
    pub fn apply_translations(
        &mut self,
        translations: &TranslationMap,
        codec: &Codec,
    ) -> Result<RelocationReport> {
        if translations.is_empty() {
            return Ok(RelocationReport::default());
        }

        let relocated = relocate(&self.container, &self.assembly, translations, codec)?;
        let assembly = decode_assembly(&relocated.code)?;

        self.container
            .replace_code(relocated.jump_table, relocated.code);
        self.assembly = assembly;

        Ok(relocated.report)
    }

    pub fn save(&self) -> Vec<u8> {
        self.container.to_bytes()
    }
}
