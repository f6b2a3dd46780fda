//! Line-oriented translation text.
//!
//! Each exported string becomes three lines:
//!
//! ```text
//! ◇0000A1B2◇original
//! ◆0000A1B2◆original
//!
//! ```
//!
//! The first line is for reference only; the second is edited and read back.

use std::collections::BTreeMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Result, ScriptError};

pub const REFERENCE_MARKER: char = '◇';
pub const EDITABLE_MARKER: char = '◆';

const BOM: char = '\u{FEFF}';

lazy_static! {
    static ref EDITABLE_LINE: Regex = Regex::new(r"^◆([0-9A-Fa-f]{8})◆(.*)$").unwrap();
}

/// Replacement text keyed by the original address of a string-load instruction.
pub type TranslationMap = BTreeMap<u32, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextUnit {
    pub address: u32,
    /// Decoded text with real control characters, not escaped.
    pub text: String,
}

/// Exported strings of one script, rendered through `Display`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextArtifact {
    units: Vec<TextUnit>,
}

impl TextArtifact {
    pub fn new(units: Vec<TextUnit>) -> Self {
        Self { units }
    }

    pub fn units(&self) -> &[TextUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl fmt::Display for TextArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for unit in &self.units {
            let s = escape(&unit.text);
            writeln!(f, "{m}{:08X}{m}{}", unit.address, s, m = REFERENCE_MARKER)?;
            writeln!(f, "{m}{:08X}{m}{}", unit.address, s, m = EDITABLE_MARKER)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

pub fn escape(s: &str) -> String {
    s.replace('\r', "\\r").replace('\n', "\\n")
}

pub fn unescape(s: &str) -> String {
    s.replace("\\r", "\r").replace("\\n", "\n")
}

/// Collect the editable lines of an edited artifact.
///
/// Blank lines and reference lines are skipped. Any other line must be a
/// well-formed editable line. A later line for the same address replaces an
/// earlier one.
pub fn parse_translations(text: &str) -> Result<TranslationMap> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let mut map = TranslationMap::new();

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with(REFERENCE_MARKER) {
            continue;
        }

        if !line.starts_with(EDITABLE_MARKER) {
            return Err(ScriptError::format(
                line_no,
                format!("line does not start with {}", EDITABLE_MARKER),
            ));
        }

        let caps = EDITABLE_LINE.captures(line).ok_or_else(|| {
            ScriptError::format(
                line_no,
                format!(
                    "expected {m}<8 hex digits>{m}<text>",
                    m = EDITABLE_MARKER
                ),
            )
        })?;

        let address = u32::from_str_radix(&caps[1], 16)
            .map_err(|e| ScriptError::format(line_no, e.to_string()))?;
        if map.insert(address, unescape(&caps[2])).is_some() {
            log::debug!("line {}: address {:08X} given again", line_no, address);
        }
    }

    Ok(map)
}
