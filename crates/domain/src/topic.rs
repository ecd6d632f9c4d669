use crate::DomainError;
use std::fmt;

const MAX_TAG_NAME_LEN: usize = 4096;

/// Opaque handle for a topic name, issued by a delivery channel when the name is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicTag(u16);

impl TopicTag {
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    pub const fn id(&self) -> u16 {
        self.0
    }

    /// Checks a topic name before it is handed to a delivery channel.
    ///
    /// Names are non-empty ASCII alphanumerics plus `-`, `_` and `.`.
    pub fn validate_name(name: &str) -> Result<(), DomainError> {
        if name.is_empty() {
            return Err(DomainError::InvalidTag("tag name is empty".to_string()));
        }
        if name.len() > MAX_TAG_NAME_LEN {
            return Err(DomainError::InvalidTag(format!(
                "tag name exceeds {} bytes",
                MAX_TAG_NAME_LEN
            )));
        }
        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(DomainError::InvalidTag(format!(
                "tag '{}' contains invalid character {:?}",
                name, c
            )));
        }
        Ok(())
    }
}

impl fmt::Display for TopicTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tag#{}", self.0)
    }
}
