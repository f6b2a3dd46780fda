use mes_nls::EncodingError;

#[derive(thiserror::Error, Debug)]
pub enum ScriptError {
    /// Malformed container or a code section that does not segment cleanly.
    #[error("structural error at offset 0x{offset:X}: {reason}")]
    Structural { offset: usize, reason: String },

    /// A text artifact line does not follow the marker grammar. `line` is 0-based.
    #[error("bad format at line {line}: {reason}")]
    Format { line: usize, reason: String },

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl ScriptError {
    pub(crate) fn structural(offset: usize, reason: impl Into<String>) -> Self {
        Self::Structural {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn format(line: usize, reason: impl Into<String>) -> Self {
        Self::Format {
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScriptError>;
