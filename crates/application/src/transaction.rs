use crate::interceptor::Capture;
use chrono::{DateTime, SecondsFormat, Utc};
use ferrous_dns_audit_domain::{DomainError, Endpoint};
use hickory_proto::op::{Message, Query};
use hickory_proto::rr::Record;

/// Everything known about one DNS exchange once the downstream chain returned.
///
/// Built by the audit handler for a single request and consumed by the encoder.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub timestamp: DateTime<Utc>,
    pub local: Endpoint,
    pub remote: Endpoint,
    pub questions: Vec<Query>,
    pub answers: Vec<Record>,
    pub response: Option<Message>,
    pub error: Option<DomainError>,
}

impl Transaction {
    pub fn new(timestamp: DateTime<Utc>, local: Endpoint, remote: Endpoint) -> Self {
        Self {
            timestamp,
            local,
            remote,
            questions: Vec::new(),
            answers: Vec::new(),
            response: None,
            error: None,
        }
    }

    pub fn with_capture(mut self, capture: Capture) -> Self {
        self.questions = capture.questions;
        self.answers = capture.answers;
        self.response = capture.response;
        self
    }

    pub fn with_error(mut self, error: Option<DomainError>) -> Self {
        self.error = error;
        self
    }

    /// Transport name of the listener that received the request (`udp` / `tcp`).
    pub fn proto(&self) -> &'static str {
        self.local.network()
    }

    /// RFC 3339 in UTC with sub-second precision, used as the record timestamp text.
    pub fn timestamp_text(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    /// Pairs every question with the answer at the same index, if there is one.
    ///
    /// Pairing is positional: a question answered by several records, or by a
    /// CNAME chain, gets whichever record happens to sit at its index.
    pub fn pairs(&self) -> impl Iterator<Item = (&Query, Option<&Record>)> + '_ {
        self.questions
            .iter()
            .enumerate()
            .map(|(i, q)| (q, self.answers.get(i)))
    }
}
