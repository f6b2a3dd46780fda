use encoding_rs::{Encoding as RsEncoding, GB18030, SHIFT_JIS, UTF_8};
use std::fmt;
use std::str::FromStr;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("unknown text encoding: {0}")]
    Unknown(String),

    #[error("{encoding}: byte sequence is not valid text")]
    Undecodable { encoding: Encoding },

    #[error("{encoding}: cannot represent {text:?}")]
    Unmappable { encoding: Encoding, text: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    ShiftJis,
    /// Treat GBK as GB18030 (superset). This is robust for legacy CN game assets.
    Gbk,
    Gb18030,
    Utf8,
}

impl Encoding {
    #[inline]
    pub fn as_encoding_rs(self) -> &'static RsEncoding {
        match self {
            Encoding::Utf8 => UTF_8,
            Encoding::ShiftJis => SHIFT_JIS,
            Encoding::Gbk => GB18030,
            Encoding::Gb18030 => GB18030,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Encoding::ShiftJis => "shift_jis",
            Encoding::Gbk => "gbk",
            Encoding::Gb18030 => "gb18030",
            Encoding::Utf8 => "utf-8",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "sjis" | "shift_jis" | "shift-jis" | "cp932" => Ok(Encoding::ShiftJis),
            "gbk" | "cp936" => Ok(Encoding::Gbk),
            "gb18030" => Ok(Encoding::Gb18030),
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            _ => Err(EncodingError::Unknown(s.to_string())),
        }
    }
}

/// A strict codec bound to one encoding.
///
/// Unlike a display decoder, nothing is replaced: a malformed byte sequence or an
/// unrepresentable character is an error, since the result is written back into
/// game data.
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec {
    enc: Encoding,
}

impl Codec {
    #[inline]
    pub fn new(enc: Encoding) -> Self {
        Self { enc }
    }

    #[inline]
    pub fn encoding(&self) -> Encoding {
        self.enc
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<String, EncodingError> {
        self.enc
            .as_encoding_rs()
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|s| s.into_owned())
            .ok_or(EncodingError::Undecodable { encoding: self.enc })
    }

    pub fn encode(&self, s: &str) -> Result<Vec<u8>, EncodingError> {
        let (cow, _, had_errors) = self.enc.as_encoding_rs().encode(s);
        if had_errors {
            return Err(EncodingError::Unmappable {
                encoding: self.enc,
                text: s.to_string(),
            });
        }
        Ok(cow.into_owned())
    }
}

impl From<Encoding> for Codec {
    fn from(enc: Encoding) -> Self {
        Self::new(enc)
    }
}
