//! One-shot CLI transport: the frame comes from arguments, the response goes
//! to a writer (stdout in the binary).

use async_trait::async_trait;
use shared_types::TransportOrigin;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::{FrameSource, RawFrame, TransportError};

pub struct CliSource<W> {
    frame: Option<Vec<u8>>,
    out: W,
}

impl<W> CliSource<W> {
    pub fn new(frame: Vec<u8>, out: W) -> Self {
        Self {
            frame: Some(frame),
            out,
        }
    }

    pub fn into_writer(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W> FrameSource for CliSource<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn read_frame(&mut self) -> Result<Option<RawFrame>, TransportError> {
        Ok(self.frame.take().map(RawFrame::Line))
    }

    async fn write_response(&mut self, response: &[u8]) -> Result<(), TransportError> {
        let io = |source| TransportError::Io {
            peer: "cli".to_string(),
            source,
        };
        self.out.write_all(response).await.map_err(io)?;
        self.out.flush().await.map_err(io)
    }

    fn origin(&self) -> TransportOrigin {
        TransportOrigin::Cli
    }

    fn peer(&self) -> &str {
        "cli"
    }
}
