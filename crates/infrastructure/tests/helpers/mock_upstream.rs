use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;

#[derive(Clone, Copy)]
pub enum UpstreamBehaviour {
    /// Answers every A question with 192.0.2.1.
    Answer,
    /// Answers NXDOMAIN.
    NxDomain,
    /// Never answers.
    Silent,
    /// Answers with a wrong id first, then the real response.
    WrongIdFirst,
}

pub fn a_query(id: u16, name: &str) -> Message {
    let mut query = Query::new();
    query.set_name(Name::from_str(name).unwrap());
    query.set_query_type(RecordType::A);
    query.set_query_class(DNSClass::IN);

    let mut message = Message::new(id, MessageType::Query, OpCode::Query);
    message.set_recursion_desired(true);
    message.add_query(query);
    message
}

fn pack(message: &Message) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut encoder = BinEncoder::new(&mut buf);
    message.emit(&mut encoder).unwrap();
    buf
}

pub struct MockUpstream {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockUpstream {
    pub async fn start(behaviour: UpstreamBehaviour) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    result = socket.recv_from(&mut buf) => {
                        let Ok((len, peer)) = result else { continue };
                        let Ok(request) = Message::from_vec(&buf[..len]) else { continue };
                        for response in Self::responses(&request, behaviour) {
                            let _ = socket.send_to(&pack(&response), peer).await;
                        }
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn responses(request: &Message, behaviour: UpstreamBehaviour) -> Vec<Message> {
        let mut response = Message::new(request.id(), MessageType::Response, OpCode::Query);
        response.set_recursion_desired(true);
        response.set_recursion_available(true);
        for query in request.queries() {
            response.add_query(query.clone());
        }

        match behaviour {
            UpstreamBehaviour::Silent => Vec::new(),
            UpstreamBehaviour::NxDomain => {
                response.set_response_code(ResponseCode::NXDomain);
                vec![response]
            }
            UpstreamBehaviour::Answer | UpstreamBehaviour::WrongIdFirst => {
                for query in request.queries() {
                    response.add_answer(Record::from_rdata(
                        query.name().clone(),
                        60,
                        RData::A(A(Ipv4Addr::new(192, 0, 2, 1))),
                    ));
                }
                if matches!(behaviour, UpstreamBehaviour::WrongIdFirst) {
                    let mut stray = Message::new(
                        request.id().wrapping_add(1),
                        MessageType::Response,
                        request.op_code(),
                    );
                    for query in response.queries() {
                        stray.add_query(query.clone());
                    }
                    for answer in response.answers() {
                        stray.add_answer(answer.clone());
                    }
                    vec![stray, response]
                } else {
                    vec![response]
                }
            }
        }
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
