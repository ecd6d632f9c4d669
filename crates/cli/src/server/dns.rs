use ferrous_dns_audit_application::ports::{DnsHandler, ResponseWriter};
use ferrous_dns_audit_infrastructure::dns::{TcpResponseWriter, UdpResponseWriter};
use hickory_proto::op::Message;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const MAX_UDP_MESSAGE_SIZE: usize = 4096;
const TCP_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Serves DNS over UDP and TCP on `socket_addr` until `shutdown` is cancelled.
pub async fn start_dns_server(
    socket_addr: SocketAddr,
    handler: Arc<dyn DnsHandler>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let domain = if socket_addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let udp_socket = Arc::new(create_udp_socket(domain, socket_addr)?);
    let tcp_listener = create_tcp_listener(domain, socket_addr)?;

    info!(bind_address = %socket_addr, handler = handler.name(), "DNS server ready");

    let mut join_set: JoinSet<()> = JoinSet::new();
    join_set.spawn(run_udp(udp_socket, handler.clone(), shutdown.clone()));
    join_set.spawn(run_tcp(tcp_listener, handler, shutdown));

    while join_set.join_next().await.is_some() {}
    info!("DNS server stopped");
    Ok(())
}

async fn run_udp(socket: Arc<UdpSocket>, handler: Arc<dyn DnsHandler>, shutdown: CancellationToken) {
    let local = match socket.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, "UDP socket has no local address");
            return;
        }
    };
    let mut recv_buf = vec![0u8; MAX_UDP_MESSAGE_SIZE];

    loop {
        let (n, peer) = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = socket.recv_from(&mut recv_buf) => match result {
                Ok(received) => received,
                Err(e) => {
                    error!(error = %e, "UDP recv error");
                    continue;
                }
            },
        };

        let query: Vec<u8> = recv_buf[..n].to_vec();
        let handler = handler.clone();
        let socket = socket.clone();
        let cancel = shutdown.child_token();
        tokio::spawn(async move {
            let mut writer = UdpResponseWriter::new(socket, local, peer);
            handle_query(handler.as_ref(), &cancel, &mut writer, &query).await;
        });
    }
}

async fn run_tcp(listener: TcpListener, handler: Arc<dyn DnsHandler>, shutdown: CancellationToken) {
    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = listener.accept() => match result {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "TCP accept error");
                    continue;
                }
            },
        };

        let handler = handler.clone();
        let cancel = shutdown.child_token();
        tokio::spawn(async move {
            serve_tcp_connection(stream, peer, handler, cancel).await;
        });
    }
}

async fn serve_tcp_connection(
    stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<dyn DnsHandler>,
    cancel: CancellationToken,
) {
    let local = match stream.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            debug!(error = %e, "TCP connection without local address");
            return;
        }
    };
    let (mut read_half, mut write_half) = stream.into_split();

    loop {
        let mut len_buf = [0u8; 2];
        let read = tokio::select! {
            _ = cancel.cancelled() => break,
            read = tokio::time::timeout(TCP_IDLE_TIMEOUT, read_half.read_exact(&mut len_buf)) => read,
        };
        if !matches!(read, Ok(Ok(_))) {
            break;
        }

        let len = u16::from_be_bytes(len_buf) as usize;
        let mut query = vec![0u8; len];
        if let Err(e) = read_half.read_exact(&mut query).await {
            debug!(client = %peer, error = %e, "Truncated TCP DNS message");
            break;
        }

        let mut writer = TcpResponseWriter::new(&mut write_half, local, peer);
        handle_query(handler.as_ref(), &cancel, &mut writer, &query).await;
    }
}

async fn handle_query(
    handler: &dyn DnsHandler,
    cancel: &CancellationToken,
    writer: &mut dyn ResponseWriter,
    query: &[u8],
) {
    let request = match Message::from_vec(query) {
        Ok(message) => message,
        Err(e) => {
            debug!(client = %writer.remote_endpoint(), error = %e, "Dropping malformed DNS query");
            return;
        }
    };

    let outcome = handler.serve_dns(cancel, writer, &request).await;
    if let Some(e) = outcome.error {
        warn!(
            client = %writer.remote_endpoint(),
            proto = writer.local_endpoint().network(),
            code = ?outcome.code,
            error = %e,
            "DNS request completed with error"
        );
    }
}

fn create_udp_socket(domain: Domain, socket_addr: SocketAddr) -> anyhow::Result<UdpSocket> {
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.set_recv_buffer_size(512 * 1024)?;
    socket.set_send_buffer_size(512 * 1024)?;
    socket.bind(&socket_addr.into())?;
    socket.set_nonblocking(true)?;
    let std_socket: std::net::UdpSocket = socket.into();
    Ok(UdpSocket::from_std(std_socket)?)
}

fn create_tcp_listener(domain: Domain, socket_addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;
    let std_listener: std::net::TcpListener = socket.into();
    Ok(TcpListener::from_std(std_listener)?)
}
