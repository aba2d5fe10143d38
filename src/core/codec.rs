//! Fixed-size frame codec.
//!
//! The server reads and writes its socket in 1024-byte units, so every frame
//! on the wire is exactly [`FRAME_SIZE`] bytes. The encoder zero-pads short
//! chunks; the decoder hands back whole frames and leaves it to the caller to
//! know how many bytes of each frame are meaningful.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::FRAME_SIZE;
use crate::error::{ProtocolError, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl Encoder<Bytes> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, chunk: Bytes, dst: &mut BytesMut) -> Result<()> {
        if chunk.len() > FRAME_SIZE {
            return Err(ProtocolError::TransportWrite(format!(
                "chunk of {} bytes exceeds frame size {FRAME_SIZE}",
                chunk.len()
            )));
        }

        dst.reserve(FRAME_SIZE);
        let padding = FRAME_SIZE - chunk.len();
        dst.put_slice(&chunk);
        dst.put_bytes(0, padding);
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.len() < FRAME_SIZE {
            src.reserve(FRAME_SIZE - src.len());
            return Ok(None);
        }
        Ok(Some(src.split_to(FRAME_SIZE)))
    }

    /// A peer that closes mid-frame still delivers what it wrote.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            Ok(None)
        } else {
            let len = src.len();
            Ok(Some(src.split_to(len)))
        }
    }
}
