use bytes::BytesMut;
use ferrous_dns_audit_infrastructure::ingest::{decode_entries, Entry, Handshake};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum IngestBehaviour {
    Accept,
    Reject,
    /// Reads the handshake but never acknowledges it.
    Stall,
}

/// Plain TCP ingest endpoint that records every handshake and entry it receives.
pub struct MockIngestServer {
    addr: SocketAddr,
    handshakes: Arc<Mutex<Vec<Handshake>>>,
    entries: Arc<Mutex<Vec<Entry>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockIngestServer {
    pub async fn start(behaviour: IngestBehaviour) -> Self {
        Self::start_on("127.0.0.1:0".parse().unwrap(), behaviour).await
    }

    pub async fn start_on(addr: SocketAddr, behaviour: IngestBehaviour) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handshakes = Arc::new(Mutex::new(Vec::new()));
        let entries = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let hs = handshakes.clone();
        let es = entries.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accepted = listener.accept() => {
                        if let Ok((stream, _)) = accepted {
                            tokio::spawn(serve(stream, behaviour, hs.clone(), es.clone()));
                        }
                    }
                }
            }
        });

        Self {
            addr,
            handshakes,
            entries,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn handshakes(&self) -> Vec<Handshake> {
        self.handshakes.lock().unwrap().clone()
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.entries.lock().unwrap().clone()
    }

    /// Polls until `count` entries arrived or five seconds passed.
    pub async fn wait_for_entries(&self, count: usize) -> Vec<Entry> {
        for _ in 0..500 {
            if self.entries.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.entries()
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockIngestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn serve(
    mut stream: TcpStream,
    behaviour: IngestBehaviour,
    handshakes: Arc<Mutex<Vec<Handshake>>>,
    entries: Arc<Mutex<Vec<Entry>>>,
) {
    let mut buf = BytesMut::with_capacity(4096);

    let handshake = loop {
        if let Ok(Some(handshake)) = Handshake::decode(&mut buf) {
            break handshake;
        }
        match stream.read_buf(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    };
    handshakes.lock().unwrap().push(handshake);

    let ack = match behaviour {
        IngestBehaviour::Accept => 0u8,
        IngestBehaviour::Reject => 1u8,
        IngestBehaviour::Stall => {
            while let Ok(n) = stream.read_buf(&mut buf).await {
                if n == 0 {
                    break;
                }
            }
            return;
        }
    };
    if stream.write_all(&[ack]).await.is_err() || behaviour == IngestBehaviour::Reject {
        return;
    }

    loop {
        if let Ok(decoded) = decode_entries(&mut buf) {
            entries.lock().unwrap().extend(decoded);
        }
        match stream.read_buf(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}
