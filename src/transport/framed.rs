//! Fixed-frame message transport over any async byte stream.
//!
//! A logical message is split into [`FRAME_SIZE`] chunks, the last one
//! zero-padded by [`FrameCodec`]. On the way back whole frames are read
//! until the meaningful length has been collected, either stated up front or
//! worked out from a header prefix; the padding beyond is discarded.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, instrument, trace};

use crate::config::FRAME_SIZE;
use crate::core::codec::FrameCodec;
use crate::error::{constants, ProtocolError, Result};
use crate::utils::metrics::Metrics;
use crate::utils::timeout::{with_timeout_error, OPERATION_TIMEOUT, RESPONSE_TIMEOUT};

/// Number of frames needed to carry `len` bytes
pub fn frame_count(len: usize) -> usize {
    len.div_ceil(FRAME_SIZE)
}

pub struct FramedConnection<S> {
    framed: Framed<S, FrameCodec>,
    send_timeout: Duration,
    recv_timeout: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl<S> FramedConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            framed: Framed::new(stream, FrameCodec),
            send_timeout: OPERATION_TIMEOUT,
            recv_timeout: RESPONSE_TIMEOUT,
            metrics: None,
        }
    }

    /// Set custom timeout durations
    pub fn with_timeouts(mut self, send_timeout: Duration, recv_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self.recv_timeout = recv_timeout;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Write `buffer` as a sequence of padded frames. An empty buffer writes
    /// nothing.
    #[instrument(skip(self, buffer), fields(len = buffer.len()), level = "debug")]
    pub async fn send(&mut self, buffer: &[u8]) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }

        let frames = frame_count(buffer.len());
        let timeout = self.send_timeout;
        let framed = &mut self.framed;

        with_timeout_error(
            async {
                for chunk in buffer.chunks(FRAME_SIZE) {
                    framed
                        .feed(Bytes::copy_from_slice(chunk))
                        .await
                        .map_err(write_error)?;
                }
                framed.flush().await.map_err(write_error)
            },
            timeout,
        )
        .await?;

        debug!(frames, "Message sent");
        if let Some(metrics) = &self.metrics {
            metrics.message_sent(frames as u64, buffer.len() as u64);
        }
        Ok(())
    }

    /// Read frames until `expected_len` meaningful bytes have arrived.
    pub async fn receive(&mut self, expected_len: usize) -> Result<Vec<u8>> {
        self.receive_message(expected_len, |_| Ok(expected_len)).await
    }

    /// Read a message whose length is known only once its first
    /// `prefix_len` bytes are in.
    ///
    /// `total_len` sees that prefix and returns the full message length, or
    /// an error that ends the read. Bytes after the prefix in the same frame
    /// are kept, so a message that fits one frame needs a single read.
    #[instrument(skip(self, total_len), level = "debug")]
    pub async fn receive_message<F>(&mut self, prefix_len: usize, total_len: F) -> Result<Vec<u8>>
    where
        F: FnOnce(&[u8]) -> Result<usize>,
    {
        let timeout = self.recv_timeout;
        let framed = &mut self.framed;

        let (data, frames) = with_timeout_error(
            async {
                let mut data = Vec::with_capacity(frame_count(prefix_len).max(1) * FRAME_SIZE);
                let mut frames = 0usize;
                let mut wanted = prefix_len;
                let mut resolve = Some(total_len);

                loop {
                    if data.len() >= wanted {
                        match resolve.take() {
                            Some(resolve) => {
                                wanted = resolve(&data[..prefix_len])?;
                                continue;
                            }
                            None => break,
                        }
                    }

                    let frame = framed
                        .next()
                        .await
                        .ok_or_else(|| {
                            ProtocolError::TransportRead(
                                constants::ERR_CONNECTION_CLOSED.to_string(),
                            )
                        })?
                        .map_err(read_error)?;

                    data.extend_from_slice(&frame);
                    frames += 1;
                    trace!(frame = frames, wanted, "Frame received");
                }

                data.truncate(wanted);
                Ok((data, frames))
            },
            timeout,
        )
        .await?;

        debug!(frames, bytes = data.len(), "Message received");
        if let Some(metrics) = &self.metrics {
            metrics.message_received(frames as u64, data.len() as u64);
        }
        Ok(data)
    }

    /// Flush and shut down the write half.
    pub async fn close(mut self) -> Result<()> {
        self.framed.close().await.map_err(write_error)
    }
}

fn write_error(err: ProtocolError) -> ProtocolError {
    match err {
        ProtocolError::Io(e) if e.kind() == io::ErrorKind::WriteZero => {
            ProtocolError::TransportWrite(constants::ERR_ZERO_WRITE.to_string())
        }
        ProtocolError::Io(e) => ProtocolError::TransportWrite(e.to_string()),
        other => other,
    }
}

fn read_error(err: ProtocolError) -> ProtocolError {
    match err {
        ProtocolError::Io(e) => ProtocolError::TransportRead(e.to_string()),
        other => other,
    }
}
