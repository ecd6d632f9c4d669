use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use ferrous_dns_audit_domain::DomainError;
use hickory_proto::op::{Message, Query};
use hickory_proto::rr::Record;
use serde::{Deserialize, Serialize};

/// Fields shared by every JSON record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordBase {
    #[serde(rename = "TS")]
    pub ts: DateTime<Utc>,
    pub proto: String,
    pub local: String,
    pub remote: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordHeader {
    pub name: String,
    pub rrtype: String,
    pub class: String,
    pub ttl: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnswerPayload {
    pub hdr: RecordHeader,
    pub data: String,
}

/// Question paired with the resource record answering it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnswerEntry {
    #[serde(flatten)]
    pub base: RecordBase,
    pub question: AnswerPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QuestionHeader {
    pub name: String,
    pub qtype: String,
    pub qclass: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BareQuestion {
    pub hdr: QuestionHeader,
}

/// Question that had no answer at its index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QuestionEntry {
    #[serde(flatten)]
    pub base: RecordBase,
    pub question: BareQuestion,
}

/// Question of a request whose resolution failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorEntry {
    #[serde(flatten)]
    pub base: RecordBase,
    pub question: QuestionHeader,
    pub error: String,
}

impl RecordBase {
    fn of(tx: &Transaction) -> Self {
        Self {
            ts: tx.timestamp,
            proto: tx.proto().to_string(),
            local: tx.local.to_string(),
            remote: tx.remote.to_string(),
        }
    }
}

impl From<&Query> for QuestionHeader {
    fn from(query: &Query) -> Self {
        Self {
            name: query.name().to_string(),
            qtype: query.query_type().to_string(),
            qclass: query.query_class().to_string(),
        }
    }
}

impl From<&Record> for AnswerPayload {
    fn from(record: &Record) -> Self {
        Self {
            hdr: RecordHeader {
                name: record.name().to_string(),
                rrtype: record.record_type().to_string(),
                class: record.dns_class().to_string(),
                ttl: record.ttl(),
            },
            data: record.data().to_string(),
        }
    }
}

fn marshal<T: Serialize>(tx: &Transaction, entry: &T) -> Vec<u8> {
    serde_json::to_vec(entry).unwrap_or_else(|e| {
        format!("{} ERROR JSON marshal: {}", tx.timestamp_text(), e).into_bytes()
    })
}

pub(super) fn encode(tx: &Transaction) -> Vec<Vec<u8>> {
    let base = RecordBase::of(tx);
    tx.pairs()
        .map(|(question, answer)| match answer {
            Some(record) => marshal(
                tx,
                &AnswerEntry {
                    base: base.clone(),
                    question: record.into(),
                },
            ),
            None => marshal(
                tx,
                &QuestionEntry {
                    base: base.clone(),
                    question: BareQuestion {
                        hdr: question.into(),
                    },
                },
            ),
        })
        .collect()
}

pub(super) fn encode_error(tx: &Transaction, request: &Message, err: &DomainError) -> Vec<Vec<u8>> {
    let base = RecordBase::of(tx);
    let error = err.to_string();
    request
        .queries()
        .iter()
        .map(|question| {
            marshal(
                tx,
                &ErrorEntry {
                    base: base.clone(),
                    question: question.into(),
                    error: error.clone(),
                },
            )
        })
        .collect()
}
