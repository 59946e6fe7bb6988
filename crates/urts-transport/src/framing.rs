// SPDX-License-Identifier: MIT
//! Length-prefixed frame I/O shared by every endpoint in this crate.

use crate::error::TransportError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use urts_proto::wire::{decode_frame_header, encode_frame, FRAME_HEADER_BYTES};

/// Write a length-prefixed frame containing `payload`.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), TransportError> {
    let framed = encode_frame(payload)?;
    writer.write_all(&framed).await?;
    Ok(())
}

/// Read one length-prefixed frame, returning its payload. A clean EOF on
/// the header read is reported as [`TransportError::ConnectionClosed`];
/// anything else mid-frame is [`TransportError::Io`].
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Vec<u8>, TransportError> {
    let mut header = [0u8; FRAME_HEADER_BYTES];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(TransportError::ConnectionClosed)
        }
        Err(e) => return Err(TransportError::Io(e)),
    }
    let len = decode_frame_header(header)?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}
