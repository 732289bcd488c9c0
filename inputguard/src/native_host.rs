// inputguard/src/native_host.rs
//! Native-messaging framing: every message is a 4-byte little-endian
//! length followed by that many bytes of UTF-8 JSON.

use log::{debug, info, warn};
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use inputguard_core::{RelayRequest, RelayResponse};

use crate::relay::RelayService;

/// Largest message a browser may send to a host.
pub const MAX_INCOMING_FRAME: usize = 64 * 1024 * 1024;
/// Largest message a host may send back.
pub const MAX_OUTGOING_FRAME: usize = 1024 * 1024;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NativeHostError {
    #[error("I/O error on the native-messaging pipe: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame of {0} bytes exceeds the {1} byte limit")]
    FrameTooLarge(usize, usize),

    #[error("Failed to encode reply: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Reads one frame. `Ok(None)` means the peer closed the pipe between
/// frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, NativeHostError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_INCOMING_FRAME {
        return Err(NativeHostError::FrameTooLarge(len, MAX_INCOMING_FRAME));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), NativeHostError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_OUTGOING_FRAME {
        return Err(NativeHostError::FrameTooLarge(payload.len(), MAX_OUTGOING_FRAME));
    }
    writer.write_all(&(payload.len() as u32).to_le_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Decodes one request frame. Anything that is not a known message gets a
/// failure reply instead of ending the session.
fn decode(frame: &[u8]) -> Result<RelayRequest, RelayResponse> {
    let value: Value = serde_json::from_slice(frame)
        .map_err(|e| RelayResponse::failure(format!("invalid JSON: {}", e)))?;
    serde_json::from_value(value.clone()).map_err(|_| {
        let kind = value.get("type").and_then(Value::as_str).unwrap_or("<none>");
        RelayResponse::failure(format!("unsupported message type '{}'", kind))
    })
}

/// Serves requests until the reader reaches end of input.
pub async fn run<R, W>(service: &RelayService, reader: &mut R, writer: &mut W) -> Result<usize, NativeHostError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Native-messaging relay started");
    let mut served = 0;
    while let Some(frame) = read_frame(reader).await? {
        let response = match decode(&frame) {
            Ok(request) => service.handle(request).await,
            Err(failure) => {
                warn!("Rejected native message: {}", failure.error.as_deref().unwrap_or_default());
                failure
            }
        };
        let mut body = serde_json::to_vec(&response)?;
        if body.len() > MAX_OUTGOING_FRAME {
            warn!("Reply of {} bytes too large for the browser; sending an error instead", body.len());
            body = serde_json::to_vec(&RelayResponse::failure("reply too large"))?;
        }
        write_frame(writer, &body).await?;
        served += 1;
    }
    debug!("Native-messaging input closed after {} message(s)", served);
    Ok(served)
}
