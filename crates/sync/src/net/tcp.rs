use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::net::Connection;

pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Writes one length-prefixed frame (`u32` big-endian length, then bytes).
pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    if frame.len() > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge(frame.len()));
    }
    writer.write_u32(frame.len() as u32).await?;
    writer.write_all(frame).await?;
    Ok(())
}

/// Reads one frame. Returns `None` on a clean end of stream.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge(len));
    }
    let mut frame = vec![0; len];
    reader.read_exact(&mut frame).await?;
    Ok(Some(frame))
}

#[derive(Debug)]
pub enum Outbound {
    Frame(Vec<u8>),
    Close(String),
}

/// Connection half that queues frames for a [`write_loop`] task.
#[derive(Debug, Clone)]
pub struct TcpConnection {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl TcpConnection {
    pub fn new(outbound: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { outbound }
    }
}

impl Connection for TcpConnection {
    fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        self.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self, reason: &str) {
        let _ = self.outbound.send(Outbound::Close(reason.to_owned()));
    }
}

/// Drains queued frames onto the socket until closed or the queue drops.
pub async fn write_loop<W>(mut writer: W, mut outbound: mpsc::UnboundedReceiver<Outbound>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Frame(frame) => {
                if let Err(e) = write_frame(&mut writer, &frame).await {
                    log::warn!("Write failed: {}", e);
                    break;
                }
            }
            Outbound::Close(reason) => {
                log::debug!("Closing connection: {}", reason);
                break;
            }
        }
    }
    let _ = writer.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_round_trip_over_a_pipe() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        write_frame(&mut a, b"hello").await.unwrap();
        write_frame(&mut a, b"").await.unwrap();
        drop(a);

        assert_eq!(read_frame(&mut b).await.unwrap(), Some(b"hello".to_vec()));
        assert_eq!(read_frame(&mut b).await.unwrap(), Some(Vec::new()));
        assert_eq!(read_frame(&mut b).await.unwrap(), None);
    }

    #[tokio::test]
    async fn oversized_length_is_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_u32((MAX_FRAME_SIZE + 1) as u32).await.unwrap();
        assert!(matches!(
            read_frame(&mut b).await,
            Err(TransportError::FrameTooLarge(_))
        ));
    }

    #[tokio::test]
    async fn write_loop_flushes_then_closes() {
        let (a, mut b) = tokio::io::duplex(1024);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut conn = TcpConnection::new(tx);
        conn.send(vec![1, 2, 3]).unwrap();
        conn.close("done");
        write_loop(a, rx).await;

        assert_eq!(read_frame(&mut b).await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(read_frame(&mut b).await.unwrap(), None);
    }
}
