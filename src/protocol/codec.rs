//! Length-prefixed packet codec
//!
//! ```text
//! +----------------+------------------+
//! | length (u32 LE)| data (length B)  |
//! +----------------+------------------+
//! ```
//!
//! Lengths above `MAX_PACKET_SIZE` are rejected before any allocation.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, Result};
use crate::hub::RawPacket;

/// Size of the length prefix
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest accepted packet
pub const MAX_PACKET_SIZE: u32 = 0x00FF_FFFF;

/// Read one packet.
///
/// Returns `Ok(None)` when the stream ends cleanly on a packet boundary.
pub async fn read_packet<R>(reader: &mut R) -> Result<Option<RawPacket>>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    let received = read_full(reader, &mut prefix).await?;
    if received == 0 {
        return Ok(None);
    }
    if received < LENGTH_PREFIX_SIZE {
        return Err(ProtocolError::Truncated {
            expected: LENGTH_PREFIX_SIZE,
            received,
        }
        .into());
    }

    let len = u32::from_le_bytes(prefix);
    if len > MAX_PACKET_SIZE {
        return Err(ProtocolError::PacketTooLarge(len).into());
    }

    let len = len as usize;
    let mut data = BytesMut::zeroed(len);
    let received = read_full(reader, &mut data).await?;
    if received < len {
        return Err(ProtocolError::Truncated {
            expected: len,
            received,
        }
        .into());
    }

    Ok(Some(RawPacket::new(data.freeze())))
}

/// Write one packet. The caller is responsible for flushing.
pub async fn write_packet<W>(writer: &mut W, packet: &RawPacket) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(packet.len())
        .ok()
        .filter(|len| *len <= MAX_PACKET_SIZE)
        .ok_or(ProtocolError::PacketTooLarge(
            packet.len().min(u32::MAX as usize) as u32,
        ))?;

    writer.write_u32_le(len).await?;
    writer.write_all(packet.data()).await?;
    Ok(())
}

/// Fill `buf` unless EOF comes first; returns the bytes read
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
