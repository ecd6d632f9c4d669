//! Turns a finished [`Transaction`] into the byte records handed to the delivery channel.
//!
//! Encoding never fails: a record that cannot be serialized is replaced by a
//! short diagnostic line so the number of records stays the same.

mod json;
mod native;
mod text;

pub use json::{
    AnswerEntry, AnswerPayload, BareQuestion, ErrorEntry, QuestionEntry, QuestionHeader, RecordBase,
    RecordHeader,
};

use crate::transaction::Transaction;
use ferrous_dns_audit_domain::{DomainError, EncodingMode};
use hickory_proto::op::Message;

/// Encoder chosen once from the configured [`EncodingMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordEncoder {
    Text,
    Json,
    Native,
}

impl RecordEncoder {
    pub fn for_mode(mode: EncodingMode) -> Self {
        match mode {
            EncodingMode::Text => Self::Text,
            EncodingMode::Json => Self::Json,
            EncodingMode::Native => Self::Native,
        }
    }

    /// Native mode needs the whole outgoing message, not just its sections.
    pub fn needs_response(&self) -> bool {
        matches!(self, Self::Native)
    }

    /// Records for a transaction: the error path when the downstream failed,
    /// the success path otherwise. Native mode emits one packed message either way.
    pub fn records(&self, tx: &Transaction, request: &Message) -> Vec<Vec<u8>> {
        match (self, &tx.error) {
            (Self::Native, _) => vec![native::pack(tx.response.as_ref().unwrap_or(request))],
            (_, Some(err)) => self.encode_error(tx, request, err),
            (_, None) => self.encode(tx),
        }
    }

    /// One record per captured question, paired with the answer at the same index.
    pub fn encode(&self, tx: &Transaction) -> Vec<Vec<u8>> {
        match self {
            Self::Text => text::encode(tx),
            Self::Json => json::encode(tx),
            Self::Native => tx.response.iter().map(native::pack).collect(),
        }
    }

    /// One record per question of the request, carrying the error text.
    pub fn encode_error(
        &self,
        tx: &Transaction,
        request: &Message,
        err: &DomainError,
    ) -> Vec<Vec<u8>> {
        match self {
            Self::Text => text::encode_error(tx, request, err),
            Self::Json => json::encode_error(tx, request, err),
            Self::Native => vec![native::pack(tx.response.as_ref().unwrap_or(request))],
        }
    }
}

impl From<EncodingMode> for RecordEncoder {
    fn from(mode: EncodingMode) -> Self {
        Self::for_mode(mode)
    }
}
