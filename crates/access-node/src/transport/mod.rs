//! # Transports
//!
//! Every transport is a [`FrameSource`]: it reads one frame and writes one
//! response. [`serve`] is the only request loop.
//!
//! ```text
//!  CLI (one frame) ──┐
//!  serial line(s) ───┼──→ serve() ──→ QueryOrchestrator::handle_frame ──→ write_response
//!  TCP (one frame) ──┘
//! ```
//!
//! Frames on one source are handled strictly in order; separate sources run
//! as separate tasks.

pub mod cli;
pub mod framing;
pub mod serial;
pub mod tcp;

use async_trait::async_trait;
use bq_04_request_protocol::ResponseToken;
use bq_05_query_orchestrator::QueryOrchestrator;
use shared_types::TransportOrigin;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

pub use cli::CliSource;
pub use framing::{LineReader, RawFrame};
pub use serial::{run_serial_line, SerialSource};
pub use tcp::{TcpFrameSource, TcpTransport};

/// Transport faults. None of them affect other sources.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error on {peer}: {source}")]
    Io {
        peer: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Read timed out on {peer}")]
    ReadTimeout { peer: String },

    #[error("Failed to open serial device {device}: {message}")]
    SerialOpen { device: String, message: String },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// A bidirectional frame channel.
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame, or `None` once the peer is done.
    async fn read_frame(&mut self) -> Result<Option<RawFrame>, TransportError>;

    /// Writes one complete response line.
    async fn write_response(&mut self, response: &[u8]) -> Result<(), TransportError>;

    fn origin(&self) -> TransportOrigin;

    /// Device path or socket address, for logs.
    fn peer(&self) -> &str;
}

/// Responses written by one [`serve`] call, by token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    pub granted: usize,
    pub denied: usize,
    pub errors: usize,
}

impl ServeStats {
    pub fn frames(&self) -> usize {
        self.granted + self.denied + self.errors
    }

    fn count(&mut self, token: ResponseToken) {
        match token {
            ResponseToken::Yes => self.granted += 1,
            ResponseToken::No => self.denied += 1,
            ResponseToken::Error => self.errors += 1,
        }
    }
}

/// Serves `source` until it ends, `max_frames` responses were written, or
/// `shutdown` flips to `true`.
///
/// Shutdown is only observed between frames: a request already read is
/// always answered.
pub async fn serve<S>(
    source: &mut S,
    orchestrator: &QueryOrchestrator,
    max_frames: Option<usize>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<ServeStats, TransportError>
where
    S: FrameSource + ?Sized,
{
    let mut stats = ServeStats::default();
    let origin = source.origin();

    loop {
        if max_frames.is_some_and(|max| stats.frames() >= max) || *shutdown.borrow() {
            break;
        }

        let frame = tokio::select! {
            biased;
            Ok(()) = shutdown.changed() => break,
            frame = source.read_frame() => frame?,
        };

        let outcome = match frame {
            None => break,
            Some(RawFrame::Line(line)) if framing::is_blank(&line) => {
                debug!(peer = source.peer(), "blank line ignored");
                continue;
            }
            Some(RawFrame::Line(line)) => orchestrator.handle_frame(&line, origin).await,
            Some(RawFrame::Oversized { len }) => {
                warn!(peer = source.peer(), len, "oversized frame discarded");
                orchestrator.reject_frame(origin, format!("frame of {len} bytes exceeds limit"))
            }
        };

        stats.count(ResponseToken::for_decision(&outcome.decision));
        // The decision and its audit stand even if the peer is gone.
        source.write_response(&outcome.response).await?;
    }

    Ok(stats)
}
