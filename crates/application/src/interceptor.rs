//! Response writer decorator that records what the chain sends back.

use crate::ports::ResponseWriter;
use async_trait::async_trait;
use ferrous_dns_audit_domain::Endpoint;
use hickory_proto::op::{Message, Query};
use hickory_proto::rr::Record;
use std::io;

/// What an [`Interceptor`] saw of the outgoing response.
#[derive(Debug, Clone, Default)]
pub struct Capture {
    pub questions: Vec<Query>,
    pub answers: Vec<Record>,
    /// Full outgoing message, only kept when the interceptor retains responses.
    pub response: Option<Message>,
}

/// Wraps the real writer and copies the question and answer sections of every
/// structured message written through it. Bytes on the wire are untouched.
///
/// Raw `write` calls are forwarded without being recorded. When `write_msg` is
/// called more than once, the last message wins.
pub struct Interceptor<'a> {
    inner: &'a mut dyn ResponseWriter,
    retain_response: bool,
    capture: Capture,
}

impl<'a> Interceptor<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self {
            inner,
            retain_response: false,
            capture: Capture::default(),
        }
    }

    /// Also keep a copy of the whole message, for encoders that need the wire form.
    pub fn retaining_response(inner: &'a mut dyn ResponseWriter) -> Self {
        Self {
            retain_response: true,
            ..Self::new(inner)
        }
    }

    pub fn questions(&self) -> &[Query] {
        &self.capture.questions
    }

    pub fn answers(&self) -> &[Record] {
        &self.capture.answers
    }

    pub fn into_capture(self) -> Capture {
        self.capture
    }
}

#[async_trait]
impl<'a> ResponseWriter for Interceptor<'a> {
    fn local_endpoint(&self) -> Endpoint {
        self.inner.local_endpoint()
    }

    fn remote_endpoint(&self) -> Endpoint {
        self.inner.remote_endpoint()
    }

    async fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.inner.write(bytes).await
    }

    async fn write_msg(&mut self, message: &Message) -> io::Result<()> {
        self.capture.questions = message.queries().to_vec();
        self.capture.answers = message.answers().to_vec();
        if self.retain_response {
            self.capture.response = Some(message.clone());
        }
        self.inner.write_msg(message).await
    }
}
