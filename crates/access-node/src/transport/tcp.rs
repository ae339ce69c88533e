//! TCP transport: one frame in, one structured response out, then close.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bq_05_query_orchestrator::QueryOrchestrator;
use bq_telemetry::metrics;
use shared_types::TransportOrigin;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::{serve, FrameSource, LineReader, RawFrame, TransportError};
use crate::config::TcpConfig;

/// One accepted connection.
pub struct TcpFrameSource {
    reader: LineReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    peer: String,
    read_timeout: Duration,
}

impl TcpFrameSource {
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        max_frame_bytes: usize,
        read_timeout: Duration,
    ) -> Self {
        let (read, writer) = stream.into_split();
        Self {
            reader: LineReader::new(read, max_frame_bytes),
            writer,
            peer: peer.to_string(),
            read_timeout,
        }
    }
}

#[async_trait]
impl FrameSource for TcpFrameSource {
    async fn read_frame(&mut self) -> Result<Option<RawFrame>, TransportError> {
        match tokio::time::timeout(self.read_timeout, self.reader.next_frame()).await {
            Ok(result) => result.map_err(|source| TransportError::Io {
                peer: self.peer.clone(),
                source,
            }),
            Err(_) => Err(TransportError::ReadTimeout {
                peer: self.peer.clone(),
            }),
        }
    }

    async fn write_response(&mut self, response: &[u8]) -> Result<(), TransportError> {
        let result = async {
            self.writer.write_all(response).await?;
            self.writer.shutdown().await
        }
        .await;
        result.map_err(|source| TransportError::Io {
            peer: self.peer.clone(),
            source,
        })
    }

    fn origin(&self) -> TransportOrigin {
        TransportOrigin::Tcp
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}

/// Bound TCP listener with a connection limit.
pub struct TcpTransport {
    listener: TcpListener,
    permits: Arc<Semaphore>,
    max_frame_bytes: usize,
    read_timeout: Duration,
}

impl TcpTransport {
    pub async fn bind(config: &TcpConfig, max_frame_bytes: usize) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(config.listen_addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: config.listen_addr,
                source,
            })?;
        Ok(Self {
            listener,
            permits: Arc::new(Semaphore::new(config.max_connections)),
            max_frame_bytes,
            read_timeout: config.read_timeout(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts until shutdown, then waits for open connections to answer.
    pub async fn run(self, orchestrator: QueryOrchestrator, mut shutdown: watch::Receiver<bool>) {
        let addr = self
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "?".to_string());
        info!(%addr, "TCP listener started");
        let mut connections = JoinSet::new();

        loop {
            // A permit is held before accepting, so excess clients wait in
            // the kernel backlog.
            let permit = tokio::select! {
                Ok(()) = shutdown.changed() => break,
                permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, peer) = tokio::select! {
                Ok(()) = shutdown.changed() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        metrics::record_transport_error(TransportOrigin::Tcp.as_str());
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                },
            };

            while connections.try_join_next().is_some() {}

            let orchestrator = orchestrator.clone();
            let shutdown = shutdown.clone();
            let mut source =
                TcpFrameSource::new(stream, peer, self.max_frame_bytes, self.read_timeout);
            connections.spawn(async move {
                let _permit = permit;
                match serve(&mut source, &orchestrator, Some(1), shutdown).await {
                    Ok(stats) => debug!(peer = %peer, frames = stats.frames(), "connection done"),
                    Err(TransportError::ReadTimeout { .. }) => {
                        debug!(peer = %peer, "idle connection dropped");
                    }
                    Err(e) => {
                        metrics::record_transport_error(TransportOrigin::Tcp.as_str());
                        warn!(peer = %peer, error = %e, "connection failed");
                    }
                }
            });
        }

        info!(open = connections.len(), "TCP listener stopping");
        while let Some(result) = connections.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "connection task failed");
            }
        }
    }
}
