//! Async length-prefixed frame codec over a socket-like duplex stream.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::{write_varint, Buffer, ProtocolError, Result};

/// Wraps a duplex stream (a [`TcpStream`], one of its owned halves, or a
/// [`tokio::io::DuplexStream`] in tests) with read/write of length-prefixed
/// frames: a VarInt byte count followed by that many payload bytes.
pub struct FramedStream<S> {
    inner: S,
}

impl<S> FramedStream<S> {
    /// Wraps an arbitrary duplex stream directly, bypassing `connect`. Used
    /// to drive a [`FramedStream`] over a [`tokio::io::DuplexStream`] half
    /// in tests, or over an owned socket half obtained some other way.
    pub fn new(inner: S) -> Self {
        FramedStream { inner }
    }
}

impl FramedStream<TcpStream> {
    /// Connects to `addr` and disables Nagle's algorithm, matching how a
    /// latency-sensitive game client should open its socket.
    pub async fn connect(addr: impl tokio::net::ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(FramedStream { inner: stream })
    }

    /// Splits into owned read/write halves so the reader and writer can be
    /// driven by independent tasks.
    #[must_use]
    pub fn into_split(
        self,
    ) -> (
        FramedStream<tokio::net::tcp::OwnedReadHalf>,
        FramedStream<tokio::net::tcp::OwnedWriteHalf>,
    ) {
        let (read, write) = self.inner.into_split();
        (FramedStream { inner: read }, FramedStream { inner: write })
    }
}

impl<S: AsyncRead + Unpin> FramedStream<S> {
    /// Reads one protocol VarInt directly off the stream, one byte at a
    /// time, the way a frame length prefix must be read before its body
    /// exists in memory.
    pub async fn read_varint(&mut self) -> Result<i32> {
        let mut result: i32 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8_or_peer_closed().await?;
            result |= i32::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift >= 35 {
                return Err(ProtocolError::VarIntTooLarge);
            }
        }
        Ok(result)
    }

    async fn read_u8_or_peer_closed(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        match self.inner.read_exact(&mut byte).await {
            Ok(_) => Ok(byte[0]),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(ProtocolError::PeerClosed)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reads one full frame: the VarInt length prefix, then that many bytes,
    /// returned as a [`Buffer`] ready for packet-id/body decoding.
    pub async fn read_frame(&mut self) -> Result<Buffer> {
        let len = self.read_varint().await? as usize;
        let mut data = vec![0u8; len];
        if len > 0 {
            self.inner
                .read_exact(&mut data)
                .await
                .map_err(|e| match e.kind() {
                    std::io::ErrorKind::UnexpectedEof => ProtocolError::PeerClosed,
                    _ => ProtocolError::Io(e),
                })?;
        }
        Ok(Buffer::new(data))
    }
}

impl<S: AsyncWrite + Unpin> FramedStream<S> {
    /// Writes one frame: `packet_id` as a leading VarInt, then `body`,
    /// prefixed by the total length of both.
    pub async fn write_frame(&mut self, packet_id: i32, body: &[u8]) -> Result<()> {
        let mut packet_id_bytes = Vec::new();
        write_varint(&mut packet_id_bytes, packet_id)?;

        let total_len = packet_id_bytes.len() + body.len();
        let mut length_bytes = Vec::new();
        write_varint(&mut length_bytes, total_len as i32)?;

        self.inner.write_all(&length_bytes).await?;
        self.inner.write_all(&packet_id_bytes).await?;
        self.inner.write_all(body).await?;
        self.inner.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frame_roundtrips_over_a_duplex_pipe() {
        let (client, server) = tokio::io::duplex(4096);
        let mut client = FramedStream { inner: client };
        let mut server = FramedStream { inner: server };

        client.write_frame(0x05, &[1, 2, 3]).await.unwrap();

        let mut buf = server.read_frame().await.unwrap();
        let packet_id = buf.read_varint().unwrap();
        assert_eq!(packet_id, 0x05);
        assert_eq!(buf.read_remaining(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn empty_frame_body_is_just_the_packet_id() {
        let (client, server) = tokio::io::duplex(64);
        let mut client = FramedStream { inner: client };
        let mut server = FramedStream { inner: server };

        client.write_frame(0x03, &[]).await.unwrap();

        let mut buf = server.read_frame().await.unwrap();
        assert_eq!(buf.read_varint().unwrap(), 0x03);
        assert_eq!(buf.remaining(), 0);
    }

    #[tokio::test]
    async fn reading_from_a_closed_peer_is_peer_closed_error() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);
        let mut server = FramedStream { inner: server };
        let err = server.read_frame().await.unwrap_err();
        assert!(matches!(err, ProtocolError::PeerClosed));
    }
}
