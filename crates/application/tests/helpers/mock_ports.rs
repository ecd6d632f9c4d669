#![allow(dead_code)]
#![allow(unused_imports)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ferrous_dns_audit_application::chain::Middleware;
use ferrous_dns_audit_application::ports::{
    DeliveryChannel, DnsHandler, ResponseWriter, ServeOutcome,
};
use ferrous_dns_audit_domain::{DomainError, Endpoint, TopicTag};
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use std::io;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Message builders
// ============================================================================

pub fn query(name: &str, record_type: RecordType) -> Query {
    let mut query = Query::new();
    query.set_name(Name::from_str(name).unwrap());
    query.set_query_type(record_type);
    query.set_query_class(DNSClass::IN);
    query
}

pub fn request(id: u16, names: &[&str]) -> Message {
    let mut message = Message::new(id, MessageType::Query, OpCode::Query);
    message.set_recursion_desired(true);
    for name in names {
        message.add_query(query(name, RecordType::A));
    }
    message
}

pub fn a_record(name: &str, ttl: u32, ip: Ipv4Addr) -> Record {
    Record::from_rdata(Name::from_str(name).unwrap(), ttl, RData::A(A(ip)))
}

pub fn response_to(request: &Message, answers: &[Record]) -> Message {
    let mut message = Message::new(request.id(), MessageType::Response, OpCode::Query);
    message.set_recursion_desired(true);
    message.set_recursion_available(true);
    message.set_response_code(ResponseCode::NoError);
    for q in request.queries() {
        message.add_query(q.clone());
    }
    for answer in answers {
        message.add_answer(answer.clone());
    }
    message
}

pub fn endpoint(s: &str) -> Endpoint {
    Endpoint::from_str(s).unwrap()
}

// ============================================================================
// MockResponseWriter
// ============================================================================

pub struct MockResponseWriter {
    local: Endpoint,
    remote: Endpoint,
    pub messages: Vec<Message>,
    pub raw: Vec<Vec<u8>>,
    fail_writes: bool,
}

impl MockResponseWriter {
    pub fn new(local: &str, remote: &str) -> Self {
        Self {
            local: endpoint(local),
            remote: endpoint(remote),
            messages: Vec::new(),
            raw: Vec::new(),
            fail_writes: false,
        }
    }

    pub fn failing(local: &str, remote: &str) -> Self {
        Self {
            fail_writes: true,
            ..Self::new(local, remote)
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

impl Default for MockResponseWriter {
    fn default() -> Self {
        Self::new("udp/10.0.0.1:53", "udp/192.0.2.5:51000")
    }
}

#[async_trait]
impl ResponseWriter for MockResponseWriter {
    fn local_endpoint(&self) -> Endpoint {
        self.local
    }

    fn remote_endpoint(&self) -> Endpoint {
        self.remote
    }

    async fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure"));
        }
        self.raw.push(bytes.to_vec());
        Ok(bytes.len())
    }

    async fn write_msg(&mut self, message: &Message) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure"));
        }
        self.messages.push(message.clone());
        Ok(())
    }
}

// ============================================================================
// MockDeliveryChannel
// ============================================================================

#[derive(Debug, Clone)]
pub struct Submitted {
    pub timestamp: DateTime<Utc>,
    pub tag: TopicTag,
    pub payload: Vec<u8>,
}

impl Submitted {
    pub fn text(&self) -> String {
        String::from_utf8(self.payload.clone()).unwrap()
    }
}

pub struct MockDeliveryChannel {
    tags: Vec<String>,
    submitted: Mutex<Vec<Submitted>>,
    attempts: Mutex<usize>,
    fail_on_attempt: Option<usize>,
}

impl MockDeliveryChannel {
    pub fn new(tags: &[&str]) -> Self {
        Self {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            submitted: Mutex::new(Vec::new()),
            attempts: Mutex::new(0),
            fail_on_attempt: None,
        }
    }

    /// Rejects the `n`-th submission (1-based); every other one is accepted.
    pub fn failing_on(tags: &[&str], n: usize) -> Self {
        Self {
            fail_on_attempt: Some(n),
            ..Self::new(tags)
        }
    }

    pub fn submitted(&self) -> Vec<Submitted> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.submitted().iter().map(Submitted::text).collect()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl DeliveryChannel for MockDeliveryChannel {
    async fn resolve_tag(&self, name: &str) -> Result<TopicTag, DomainError> {
        TopicTag::validate_name(name)?;
        self.tags
            .iter()
            .position(|t| t == name)
            .map(|i| TopicTag::new(i as u16))
            .ok_or_else(|| DomainError::UnknownTag(name.to_string()))
    }

    async fn submit(
        &self,
        timestamp: DateTime<Utc>,
        tag: TopicTag,
        payload: Vec<u8>,
    ) -> Result<(), DomainError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts += 1;
            *attempts
        };
        if self.fail_on_attempt == Some(attempt) {
            return Err(DomainError::DeliveryRejected(format!(
                "mock rejected record {}",
                attempt
            )));
        }
        self.submitted.lock().unwrap().push(Submitted {
            timestamp,
            tag,
            payload,
        });
        Ok(())
    }
}

// ============================================================================
// StaticHandler
// ============================================================================

/// Terminal handler with a canned behaviour.
pub enum StaticHandler {
    /// Writes a response carrying these answers.
    Answer(Vec<Record>),
    /// Writes a SERVFAIL response and fails with this error.
    Fail(DomainError),
    /// Writes nothing and fails with this error.
    FailSilently(DomainError),
    /// Writes already packed bytes.
    Raw(Vec<u8>),
}

#[async_trait]
impl DnsHandler for StaticHandler {
    async fn serve_dns(
        &self,
        _cancel: &CancellationToken,
        writer: &mut dyn ResponseWriter,
        request: &Message,
    ) -> ServeOutcome {
        match self {
            StaticHandler::Answer(answers) => {
                match writer.write_msg(&response_to(request, answers)).await {
                    Ok(()) => ServeOutcome::success(ResponseCode::NoError),
                    Err(e) => ServeOutcome::failure(ResponseCode::ServFail, e.into()),
                }
            }
            StaticHandler::Fail(err) => {
                let mut response = response_to(request, &[]);
                response.set_response_code(ResponseCode::ServFail);
                let _ = writer.write_msg(&response).await;
                ServeOutcome::failure(ResponseCode::ServFail, err.clone())
            }
            StaticHandler::FailSilently(err) => {
                ServeOutcome::failure(ResponseCode::ServFail, err.clone())
            }
            StaticHandler::Raw(bytes) => match writer.write(bytes).await {
                Ok(_) => ServeOutcome::success(ResponseCode::NoError),
                Err(e) => ServeOutcome::failure(ResponseCode::ServFail, e.into()),
            },
        }
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

// ============================================================================
// TracingMiddleware
// ============================================================================

/// Records the order in which wrapped handlers are entered.
pub struct TracingMiddleware {
    pub label: &'static str,
    pub log: Arc<Mutex<Vec<&'static str>>>,
}

struct TracingHandler {
    label: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
    next: Arc<dyn DnsHandler>,
}

impl Middleware for TracingMiddleware {
    fn name(&self) -> &'static str {
        self.label
    }

    fn wrap(&self, next: Arc<dyn DnsHandler>) -> Arc<dyn DnsHandler> {
        Arc::new(TracingHandler {
            label: self.label,
            log: Arc::clone(&self.log),
            next,
        })
    }
}

#[async_trait]
impl DnsHandler for TracingHandler {
    async fn serve_dns(
        &self,
        cancel: &CancellationToken,
        writer: &mut dyn ResponseWriter,
        request: &Message,
    ) -> ServeOutcome {
        self.log.lock().unwrap().push(self.label);
        self.next.serve_dns(cancel, writer, request).await
    }

    fn name(&self) -> &'static str {
        self.label
    }
}
