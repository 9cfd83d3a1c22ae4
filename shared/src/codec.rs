//! Length-prefixed bincode framing for gameplay traffic.
//!
//! Every frame is a big-endian `u32` body length followed by a bincode
//! encoded [`Packet`]. Encoding is split from writing so a server can
//! encode a snapshot once and hand the same bytes to every session.

use crate::{Packet, MAX_FRAME_LEN};
use std::io::ErrorKind;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("frame of {0} bytes exceeds the {MAX_FRAME_LEN} byte limit")]
    FrameTooLarge(usize),

    #[error("connection closed")]
    Closed,

    #[error("unexpected {0} packet")]
    Unexpected(&'static str),
}

/// Encodes `packet` into a complete frame, length prefix included.
pub fn encode_frame(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    let body = bincode::serialize(packet)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(body.len()));
    }

    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decodes a frame body (without the length prefix).
pub fn decode_packet(body: &[u8]) -> Result<Packet, ProtocolError> {
    Ok(bincode::deserialize(body)?)
}

/// Reads one packet. A clean end of stream before a length prefix yields `Closed`.
pub async fn read_packet<R>(reader: &mut R) -> Result<Packet, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Err(ProtocolError::Closed),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    decode_packet(&body)
}

/// Writes an already encoded frame and flushes.
pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(packet)?;
    write_frame(writer, &frame).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Direction;
    use tokio_test::io::Builder;

    #[test]
    fn test_frame_has_length_prefix() {
        let frame = encode_frame(&Packet::Disconnect).unwrap();
        let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        assert_eq!(len, frame.len() - 4);
    }

    #[tokio::test]
    async fn test_read_packet_from_stream() {
        let frame = encode_frame(&Packet::Intent {
            direction: Direction::Left,
        })
        .unwrap();
        let mut stream = Builder::new().read(&frame).build();

        match read_packet(&mut stream).await.unwrap() {
            Packet::Intent { direction } => assert_eq!(direction, Direction::Left),
            other => panic!("Unexpected packet: {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_read_packet_split_across_reads() {
        let frame = encode_frame(&Packet::ProbeEcho { timestamp: 99 }).unwrap();
        let (head, tail) = frame.split_at(2);
        let mut stream = Builder::new().read(head).read(tail).build();

        match read_packet(&mut stream).await.unwrap() {
            Packet::ProbeEcho { timestamp } => assert_eq!(timestamp, 99),
            other => panic!("Unexpected packet: {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_read_packet_reports_closed_stream() {
        let mut stream = Builder::new().build();
        assert!(matches!(
            read_packet(&mut stream).await,
            Err(ProtocolError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_read_packet_rejects_oversized_frame() {
        let prefix = ((MAX_FRAME_LEN + 1) as u32).to_be_bytes();
        let mut stream = Builder::new().read(&prefix).build();
        assert!(matches!(
            read_packet(&mut stream).await,
            Err(ProtocolError::FrameTooLarge(_))
        ));
    }

    #[tokio::test]
    async fn test_read_packet_rejects_garbage_body() {
        let mut frame = 2u32.to_be_bytes().to_vec();
        frame.extend_from_slice(&[0xff, 0xff]);
        let mut stream = Builder::new().read(&frame).build();
        assert!(matches!(
            read_packet(&mut stream).await,
            Err(ProtocolError::Codec(_))
        ));
    }

    #[tokio::test]
    async fn test_write_packet_emits_frame() {
        let packet = Packet::Connected {
            player_id: "Player_1".to_string(),
        };
        let expected = encode_frame(&packet).unwrap();
        let mut stream = Builder::new().write(&expected).build();

        write_packet(&mut stream, &packet).await.unwrap();
    }
}
