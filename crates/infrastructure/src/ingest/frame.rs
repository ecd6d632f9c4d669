//! Wire framing for the ingest stream.
//!
//! A connection opens with a handshake:
//!
//! ```text
//! "FDAI" | version u8 | secret_len u16 | secret | tag_count u16 | (name_len u16 | name)*
//! ```
//!
//! answered by one status byte (`0` = accepted). Entries follow back to back:
//!
//! ```text
//! tag u16 | seconds i64 | nanos u32 | payload_len u32 | payload
//! ```
//!
//! All integers are big endian. The spill cache stores entries in the same form.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use ferrous_dns_audit_domain::{DomainError, TopicTag};

pub const MAGIC: &[u8; 4] = b"FDAI";
pub const PROTOCOL_VERSION: u8 = 1;
pub const ACK_ACCEPTED: u8 = 0;

pub const ENTRY_HEADER_LEN: usize = 2 + 8 + 4 + 4;
pub const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

/// One record waiting to be shipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub timestamp: DateTime<Utc>,
    pub tag: TopicTag,
    pub payload: Bytes,
}

impl Entry {
    pub fn new(timestamp: DateTime<Utc>, tag: TopicTag, payload: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            tag,
            payload: payload.into(),
        }
    }

    pub fn encoded_len(&self) -> usize {
        ENTRY_HEADER_LEN + self.payload.len()
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_len());
        buf.put_u16(self.tag.id());
        buf.put_i64(self.timestamp.timestamp());
        buf.put_u32(self.timestamp.timestamp_subsec_nanos());
        buf.put_u32(self.payload.len() as u32);
        buf.put_slice(&self.payload);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Takes one complete entry off the front of `buf`.
    ///
    /// Returns `Ok(None)` and leaves `buf` untouched when it does not hold a full entry yet.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, DomainError> {
        if buf.len() < ENTRY_HEADER_LEN {
            return Ok(None);
        }

        let mut header = &buf[..ENTRY_HEADER_LEN];
        let tag = header.get_u16();
        let secs = header.get_i64();
        let nanos = header.get_u32();
        let len = header.get_u32() as usize;

        if len > MAX_PAYLOAD_LEN {
            return Err(DomainError::InvalidDnsMessage(format!(
                "Ingest entry payload of {} bytes exceeds limit",
                len
            )));
        }
        if buf.len() < ENTRY_HEADER_LEN + len {
            return Ok(None);
        }

        let timestamp = DateTime::from_timestamp(secs, nanos).ok_or_else(|| {
            DomainError::InvalidDnsMessage(format!(
                "Ingest entry timestamp out of range: {}.{}",
                secs, nanos
            ))
        })?;

        buf.advance(ENTRY_HEADER_LEN);
        let payload = buf.split_to(len).freeze();

        Ok(Some(Self {
            timestamp,
            tag: TopicTag::new(tag),
            payload,
        }))
    }
}

/// Opening frame of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub secret: String,
    pub tags: Vec<String>,
}

impl Handshake {
    pub fn new(secret: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            secret: secret.into(),
            tags,
        }
    }

    pub fn encode(&self) -> Result<Bytes, DomainError> {
        let mut buf = BytesMut::new();
        buf.put_slice(MAGIC);
        buf.put_u8(PROTOCOL_VERSION);
        put_str(&mut buf, &self.secret, "ingest secret")?;

        let count = u16::try_from(self.tags.len())
            .map_err(|_| DomainError::InvalidTag("too many tags".to_string()))?;
        buf.put_u16(count);
        for tag in &self.tags {
            put_str(&mut buf, tag, "tag name")?;
        }
        Ok(buf.freeze())
    }

    /// Reads a handshake off the front of `buf`, `Ok(None)` while incomplete.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, DomainError> {
        let mut cursor = &buf[..];

        if cursor.len() < MAGIC.len() + 1 {
            return Ok(None);
        }
        if &cursor[..MAGIC.len()] != MAGIC {
            return Err(DomainError::InvalidDnsMessage(
                "Bad ingest handshake magic".to_string(),
            ));
        }
        cursor.advance(MAGIC.len());

        let version = cursor.get_u8();
        if version != PROTOCOL_VERSION {
            return Err(DomainError::InvalidDnsMessage(format!(
                "Unsupported ingest protocol version {}",
                version
            )));
        }

        let Some(secret) = get_str(&mut cursor)? else {
            return Ok(None);
        };
        if cursor.remaining() < 2 {
            return Ok(None);
        }
        let count = cursor.get_u16();
        let mut tags = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let Some(tag) = get_str(&mut cursor)? else {
                return Ok(None);
            };
            tags.push(tag);
        }

        let consumed = buf.len() - cursor.remaining();
        buf.advance(consumed);
        Ok(Some(Self { secret, tags }))
    }
}

/// Decodes every complete entry at the front of `buf`; used when reading
/// an ingest stream or spill file back.
pub fn decode_entries(buf: &mut BytesMut) -> Result<Vec<Entry>, DomainError> {
    let mut entries = Vec::new();
    while let Some(entry) = Entry::decode(buf)? {
        entries.push(entry);
    }
    Ok(entries)
}

fn put_str(buf: &mut BytesMut, value: &str, what: &str) -> Result<(), DomainError> {
    let len = u16::try_from(value.len())
        .map_err(|_| DomainError::ConfigError(format!("{} is too long", what)))?;
    buf.put_u16(len);
    buf.put_slice(value.as_bytes());
    Ok(())
}

fn get_str(cursor: &mut &[u8]) -> Result<Option<String>, DomainError> {
    if cursor.remaining() < 2 {
        return Ok(None);
    }
    let len = u16::from_be_bytes([cursor[0], cursor[1]]) as usize;
    if cursor.remaining() < 2 + len {
        return Ok(None);
    }
    cursor.advance(2);
    let value = String::from_utf8(cursor[..len].to_vec())
        .map_err(|e| DomainError::InvalidDnsMessage(format!("Handshake string is not UTF-8: {}", e)))?;
    cursor.advance(len);
    Ok(Some(value))
}
