use std::net::SocketAddr;

use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use ticksync::net::{TcpConnection, read_frame, write_loop};

/// Socket activity forwarded to the game loop. `key` identifies the socket
/// until the loop has registered it with the server.
#[derive(Debug)]
pub enum NetEvent {
    Connected {
        key: u64,
        address: SocketAddr,
        link: TcpConnection,
    },
    Frame {
        key: u64,
        frame: Vec<u8>,
    },
    Closed {
        key: u64,
        reason: String,
    },
}

pub async fn accept_loop(listener: TcpListener, events: mpsc::UnboundedSender<NetEvent>) {
    let mut next_key = 0;
    loop {
        let (stream, address) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                log::warn!("Failed to accept connection: {}", e);
                continue;
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            log::debug!("Could not disable Nagle for {}: {}", address, e);
        }

        let key = next_key;
        next_key += 1;

        let (reader, writer) = stream.into_split();
        let (outbound, queued) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(writer, queued));

        let link = TcpConnection::new(outbound);
        if events
            .send(NetEvent::Connected { key, address, link })
            .is_err()
        {
            break;
        }
        tokio::spawn(read_loop(key, reader, events.clone()));
    }
}

async fn read_loop(key: u64, mut reader: OwnedReadHalf, events: mpsc::UnboundedSender<NetEvent>) {
    let reason = loop {
        match read_frame(&mut reader).await {
            Ok(Some(frame)) => {
                if events.send(NetEvent::Frame { key, frame }).is_err() {
                    return;
                }
            }
            Ok(None) => break "connection closed".to_owned(),
            Err(e) => break e.to_string(),
        }
    };
    let _ = events.send(NetEvent::Closed { key, reason });
}
