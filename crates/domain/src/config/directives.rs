//! Parser for the directive-block form of the ingest settings:
//!
//! ```text
//! ingest {
//!     Ingest-Secret testing
//!     Cleartext-Target 192.168.1.1:4024
//!     Tag dns   # trailing comments are allowed
//!     Encoding json
//! }
//! ```
//!
//! Directive names are case-insensitive and each takes exactly one argument.

use std::path::PathBuf;

use super::errors::ConfigError;
use super::ingest::IngestConfig;
use super::logging::LogLevel;
use super::target::IngestTarget;

/// Keyword that opens the block.
pub const BLOCK_NAME: &str = "ingest";

/// Parses one `ingest { ... }` block and validates the result.
pub fn parse_directive_block(input: &str) -> Result<IngestConfig, ConfigError> {
    let lines = tokenize(input)?;
    let mut lines = lines.into_iter();

    let mut header = lines
        .next()
        .ok_or_else(|| ConfigError::Parse("empty configuration".to_string()))?;
    if !header[0].eq_ignore_ascii_case(BLOCK_NAME) {
        return Err(ConfigError::Parse(format!(
            "expected '{}' block, found '{}'",
            BLOCK_NAME, header[0]
        )));
    }
    header.remove(0);

    let mut config = IngestConfig::default();
    let mut tag_seen = false;

    match header.as_slice() {
        [] => {
            if let Some(extra) = lines.next() {
                return Err(ConfigError::Parse(format!(
                    "unexpected '{}' after empty {} block",
                    extra[0], BLOCK_NAME
                )));
            }
        }
        [open] if open == "{" => {
            let mut closed = false;
            for mut line in lines.by_ref() {
                if line.last().map(String::as_str) == Some("}") {
                    line.pop();
                    closed = true;
                }
                if !line.is_empty() {
                    apply_directive(&mut config, &mut tag_seen, &line)?;
                }
                if closed {
                    break;
                }
            }
            if !closed {
                return Err(ConfigError::Parse(format!(
                    "unterminated {} block",
                    BLOCK_NAME
                )));
            }
            if let Some(extra) = lines.next() {
                return Err(ConfigError::Parse(format!(
                    "unexpected '{}' after {} block",
                    extra[0], BLOCK_NAME
                )));
            }
        }
        other => {
            return Err(ConfigError::Parse(format!(
                "unexpected arguments to {}: {}",
                BLOCK_NAME,
                other.join(" ")
            )));
        }
    }

    config.validate()?;
    Ok(config)
}

/// Splits `line` into `(name, value)`; the name is lowercased.
pub(crate) fn arg_line(line: &[String]) -> Result<(String, &str), ConfigError> {
    let name = line[0].to_ascii_lowercase();
    match line.len() {
        1 => Err(ConfigError::Parse(format!("Missing argument to {}", name))),
        2 => Ok((name, line[1].as_str())),
        _ => Err(ConfigError::Parse(format!(
            "{} only takes one argument",
            name
        ))),
    }
}

fn apply_directive(
    config: &mut IngestConfig,
    tag_seen: &mut bool,
    line: &[String],
) -> Result<(), ConfigError> {
    let (name, value) = arg_line(line)?;

    match name.as_str() {
        "log-level" => {
            config.log_level = value
                .parse::<LogLevel>()
                .map_err(ConfigError::Validation)?;
        }
        "ingest-cache-path" => {
            config.ingest_cache_path = Some(PathBuf::from(value).components().collect());
        }
        "max-cache-size-mb" => {
            config.max_cache_size_mb = value.parse::<u64>().map_err(|e| {
                ConfigError::Validation(format!("Invalid max cache size '{}': {}", value, e))
            })?;
        }
        "ingest-secret" => config.ingest_secret = value.to_string(),
        "cleartext-target" => {
            IngestTarget::cleartext(value).map_err(ConfigError::Validation)?;
            config.cleartext_targets.push(value.to_string());
        }
        "ciphertext-target" => {
            IngestTarget::ciphertext(value).map_err(ConfigError::Validation)?;
            config.ciphertext_targets.push(value.to_string());
        }
        "insecure-novalidate-tls" => {
            config.insecure_novalidate_tls = match value {
                "true" => true,
                "false" => false,
                other => {
                    return Err(ConfigError::Validation(format!(
                        "Unknown insecure-novalidate-tls argument {}",
                        other
                    )))
                }
            };
        }
        "tag" => {
            if *tag_seen {
                return Err(ConfigError::Validation(
                    "Tag not appropriately defined. Exactly one tag must be specified"
                        .to_string(),
                ));
            }
            *tag_seen = true;
            config.tag = value.to_string();
        }
        "encoding" => {
            config.encoding = value.parse().map_err(ConfigError::Validation)?;
        }
        other => {
            return Err(ConfigError::Validation(format!(
                "Unknown configuration directive {}",
                other
            )));
        }
    }

    Ok(())
}

/// Breaks the input into non-empty lines of tokens.
///
/// `#` starts a comment outside quotes; double quotes group whitespace and
/// accept `\"` escapes.
pub(crate) fn tokenize(input: &str) -> Result<Vec<Vec<String>>, ConfigError> {
    let mut lines = Vec::new();

    for (idx, raw) in input.lines().enumerate() {
        let mut tokens = Vec::new();
        let mut chars = raw.chars().peekable();

        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
            } else if c == '#' {
                break;
            } else if c == '"' {
                chars.next();
                let mut token = String::new();
                let mut terminated = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' if chars.peek() == Some(&'"') => {
                            token.push('"');
                            chars.next();
                        }
                        '"' => {
                            terminated = true;
                            break;
                        }
                        _ => token.push(c),
                    }
                }
                if !terminated {
                    return Err(ConfigError::Parse(format!(
                        "unterminated quote on line {}",
                        idx + 1
                    )));
                }
                tokens.push(token);
            } else {
                let mut token = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '#' {
                        break;
                    }
                    token.push(c);
                    chars.next();
                }
                tokens.push(token);
            }
        }

        if !tokens.is_empty() {
            lines.push(tokens);
        }
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_quoted_names_and_values() {
        let lines = tokenize(
            r#"ingest {
                A B
                Stuff "things foo bar"
                "this is a test" "for more tests"
            }"#,
        )
        .unwrap();

        for line in &lines[1..lines.len() - 1] {
            let (name, value) = arg_line(line).unwrap();
            assert!(!name.is_empty());
            assert!(!value.is_empty());
        }
        assert_eq!(lines[2], vec!["Stuff", "things foo bar"]);
        assert_eq!(lines[3], vec!["this is a test", "for more tests"]);
    }

    #[test]
    fn test_tokenize_strips_comments() {
        let lines = tokenize("Tag dns #comment about tag\tand a space\n#only a comment\n").unwrap();
        assert_eq!(lines, vec![vec!["Tag".to_string(), "dns".to_string()]]);
    }

    #[test]
    fn test_tokenize_unterminated_quote() {
        assert!(tokenize("Tag \"dns").is_err());
    }

    #[test]
    fn test_arg_line_arity() {
        let missing = vec!["Tag".to_string()];
        let extra = vec!["Tag".to_string(), "a".to_string(), "b".to_string()];
        assert!(arg_line(&missing)
            .unwrap_err()
            .to_string()
            .contains("Missing argument to tag"));
        assert!(arg_line(&extra)
            .unwrap_err()
            .to_string()
            .contains("tag only takes one argument"));
    }
}
