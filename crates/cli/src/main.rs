use clap::Parser;
use ferrous_dns_audit_application::chain::{AuditMiddleware, HandlerChain};
use ferrous_dns_audit_domain::CliOverrides;
use ferrous_dns_audit_infrastructure::dns::UpstreamForwarder;
use ferrous_dns_audit_infrastructure::ingest::IngestMuxer;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod bootstrap;
mod server;

/// How long startup waits for the first ingest connection.
const INGEST_HOT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "ferrous-dns-audit")]
#[command(version)]
#[command(about = "DNS forwarder that audits every transaction to a telemetry ingest service")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// File with an `ingest { ... }` directive block, replaces the [ingest] section
    #[arg(long, value_name = "FILE")]
    corefile: Option<String>,

    /// DNS server port
    #[arg(short = 'd', long)]
    dns_port: Option<u16>,

    /// Bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// Upstream resolver (ip:port)
    #[arg(short = 'u', long)]
    upstream: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        dns_port: cli.dns_port,
        bind_address: cli.bind.clone(),
        upstream: cli.upstream.clone(),
        log_level: cli.log_level.clone(),
        corefile: cli.corefile.clone(),
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;

    bootstrap::init_logging(&config);

    info!("Starting Ferrous DNS Audit v{}", env!("CARGO_PKG_VERSION"));

    let shutdown = CancellationToken::new();

    // Startup fails when no ingest target accepts the handshake
    let muxer = IngestMuxer::start(&config.ingest, shutdown.clone()).await?;
    if let Err(e) = muxer.wait_for_hot(INGEST_HOT_TIMEOUT).await {
        error!(error = %e, "Timed out waiting for ingest connection");
        shutdown.cancel();
        muxer.join().await;
        return Err(e.into());
    }

    let audit = AuditMiddleware::setup(&config.ingest, muxer.clone()).await?;
    let forwarder = UpstreamForwarder::from_config(&config.upstream)?;
    info!(upstream = %forwarder.server(), "Forwarding to upstream resolver");

    let handler = HandlerChain::new()
        .register(Arc::new(audit))
        .build(Arc::new(forwarder));

    let bind_ip: IpAddr = config.server.bind_address.parse()?;
    let dns_addr = SocketAddr::new(bind_ip, config.server.dns_port);

    let mut dns_server = tokio::spawn(server::start_dns_server(
        dns_addr,
        handler,
        shutdown.clone(),
    ));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received");
        }
        result = &mut dns_server => {
            shutdown.cancel();
            muxer.join().await;
            return result?;
        }
    }

    shutdown.cancel();
    dns_server.await??;
    muxer.join().await;

    info!("Server shutdown complete");
    Ok(())
}
