use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Serialization strategy for audit records, fixed for the lifetime of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EncodingMode {
    /// One human-readable line per question.
    Text,
    /// One JSON object per question.
    #[default]
    Json,
    /// The packed wire-format DNS message, unmodified.
    Native,
}

impl EncodingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncodingMode::Text => "text",
            EncodingMode::Json => "json",
            EncodingMode::Native => "native",
        }
    }
}

impl fmt::Display for EncodingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case and surrounding whitespace are ignored. `binary` is an alias for
/// `native`, and an empty value selects the default (`json`).
impl FromStr for EncodingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binary" | "native" => Ok(EncodingMode::Native),
            "text" => Ok(EncodingMode::Text),
            "json" | "" => Ok(EncodingMode::Json),
            _ => Err(format!("Unknown encoding type '{}'", s.trim())),
        }
    }
}

impl Serialize for EncodingMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EncodingMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
