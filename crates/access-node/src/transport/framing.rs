//! Newline-delimited framing with a hard size limit.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// One unit read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFrame {
    /// A complete line, terminator included when present.
    Line(Vec<u8>),
    /// A line longer than the limit. Its bytes were discarded.
    Oversized { len: usize },
}

/// Reads `\n`-terminated frames, never buffering more than `max_frame_bytes`
/// of one line.
pub struct LineReader<R> {
    inner: BufReader<R>,
    max_frame_bytes: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R, max_frame_bytes: usize) -> Self {
        Self {
            inner: BufReader::new(reader),
            max_frame_bytes,
        }
    }

    /// Next frame, or `None` at a clean end of stream. A final line without
    /// terminator is still returned.
    pub async fn next_frame(&mut self) -> std::io::Result<Option<RawFrame>> {
        let mut line = Vec::new();
        let mut total = 0usize;
        let mut discarding = false;

        loop {
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                if total == 0 {
                    return Ok(None);
                }
                break;
            }

            let (chunk_len, complete) = match available.iter().position(|b| *b == b'\n') {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            };
            total += chunk_len;
            if !discarding && total <= self.max_frame_bytes {
                line.extend_from_slice(&available[..chunk_len]);
            } else if !discarding {
                discarding = true;
                line = Vec::new();
            }
            self.inner.consume(chunk_len);

            if complete {
                break;
            }
        }

        if discarding {
            Ok(Some(RawFrame::Oversized { len: total }))
        } else {
            Ok(Some(RawFrame::Line(line)))
        }
    }
}

/// True for lines holding nothing but whitespace. Serial sensors emit these
/// between frames; they get no response.
pub fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}
