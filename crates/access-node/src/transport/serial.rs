//! Serial line transport (R307-style sensor controllers).
//!
//! 8N1 framing at the configured baud rate. A line is half-duplex: one frame
//! in, one response out, strictly in order. A lost device is reopened after
//! `reconnect_delay` without affecting other lines.

use async_trait::async_trait;
use bq_05_query_orchestrator::QueryOrchestrator;
use bq_telemetry::metrics;
use shared_types::TransportOrigin;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::watch;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{error, info, instrument, warn};

use super::{serve, FrameSource, LineReader, RawFrame, TransportError};
use crate::config::SerialConfig;

/// A frame source over any byte stream; [`SerialSource::open`] gives the
/// device-backed one.
pub struct SerialSource<S = SerialStream> {
    reader: LineReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    device: String,
}

impl SerialSource<SerialStream> {
    pub fn open(config: &SerialConfig, max_frame_bytes: usize) -> Result<Self, TransportError> {
        let stream = tokio_serial::new(&config.device, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(|e| TransportError::SerialOpen {
                device: config.device.clone(),
                message: e.to_string(),
            })?;
        Ok(Self::from_stream(stream, config.device.clone(), max_frame_bytes))
    }
}

impl<S: AsyncRead + AsyncWrite> SerialSource<S> {
    pub fn from_stream(stream: S, device: String, max_frame_bytes: usize) -> Self {
        let (read, writer) = tokio::io::split(stream);
        Self {
            reader: LineReader::new(read, max_frame_bytes),
            writer,
            device,
        }
    }
}

#[async_trait]
impl<S> FrameSource for SerialSource<S>
where
    S: AsyncRead + AsyncWrite + Send,
{
    async fn read_frame(&mut self) -> Result<Option<RawFrame>, TransportError> {
        self.reader.next_frame().await.map_err(|source| TransportError::Io {
            peer: self.device.clone(),
            source,
        })
    }

    async fn write_response(&mut self, response: &[u8]) -> Result<(), TransportError> {
        let result = async {
            self.writer.write_all(response).await?;
            self.writer.flush().await
        }
        .await;
        result.map_err(|source| TransportError::Io {
            peer: self.device.clone(),
            source,
        })
    }

    fn origin(&self) -> TransportOrigin {
        TransportOrigin::Serial
    }

    fn peer(&self) -> &str {
        &self.device
    }
}

/// Keeps one serial line served until shutdown, reopening the device after
/// every fault.
#[instrument(skip_all, fields(device = %config.device, baud = config.baud_rate))]
pub async fn run_serial_line(
    config: SerialConfig,
    orchestrator: QueryOrchestrator,
    max_frame_bytes: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    while !*shutdown.borrow() {
        match SerialSource::open(&config, max_frame_bytes) {
            Ok(mut source) => {
                info!("serial line open");
                match serve(&mut source, &orchestrator, None, shutdown.clone()).await {
                    Ok(stats) if *shutdown.borrow() => {
                        info!(frames = stats.frames(), "serial line closed for shutdown");
                        return;
                    }
                    Ok(stats) => {
                        warn!(frames = stats.frames(), "serial device closed the stream");
                    }
                    Err(e) => {
                        metrics::record_transport_error(TransportOrigin::Serial.as_str());
                        error!(error = %e, "serial line lost");
                    }
                }
            }
            Err(e) => {
                metrics::record_transport_error(TransportOrigin::Serial.as_str());
                error!(error = %e, "serial device unavailable");
            }
        }

        info!(
            delay_ms = config.reconnect_delay_ms,
            "reopening serial device after delay"
        );
        tokio::select! {
            _ = tokio::time::sleep(config.reconnect_delay()) => {}
            _ = shutdown.changed() => {}
        }
    }
}
