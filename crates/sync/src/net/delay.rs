use std::collections::VecDeque;

use crate::error::TransportError;
use crate::net::Connection;

/// Holds outgoing frames back for a fixed number of server steps before
/// handing them to the wrapped connection. Frame order is kept.
#[derive(Debug)]
pub struct DelayedConnection<C> {
    inner: C,
    delay: u32,
    step: u64,
    held: VecDeque<(u64, Vec<u8>)>,
}

impl<C: Connection> DelayedConnection<C> {
    pub fn new(inner: C, delay: u32) -> Self {
        Self {
            inner,
            delay,
            step: 0,
            held: VecDeque::new(),
        }
    }

    /// Steps each frame is held for.
    pub fn delay(&self) -> u32 {
        self.delay
    }

    pub fn held(&self) -> usize {
        self.held.len()
    }
}

impl<C: Connection> Connection for DelayedConnection<C> {
    fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        if self.delay == 0 {
            return self.inner.send(frame);
        }
        self.held.push_back((self.step + self.delay as u64, frame));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        while self.held.front().is_some_and(|(due, _)| *due <= self.step) {
            if let Some((_, frame)) = self.held.pop_front() {
                self.inner.send(frame)?;
            }
        }
        self.step += 1;
        self.inner.flush()
    }

    /// Closing releases whatever is still held first.
    fn close(&mut self, reason: &str) {
        for (_, frame) in self.held.drain(..) {
            if self.inner.send(frame).is_err() {
                break;
            }
        }
        self.inner.close(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::MemoryConnection;

    #[test]
    fn frames_wait_the_configured_steps() {
        let (conn, peer) = MemoryConnection::pair();
        let mut delayed = DelayedConnection::new(conn, 2);

        delayed.send(vec![1]).unwrap();
        delayed.flush().unwrap();
        delayed.send(vec![2]).unwrap();
        assert_eq!(peer.pending(), 0);

        delayed.flush().unwrap();
        assert_eq!(peer.pending(), 0);
        delayed.flush().unwrap();
        assert_eq!(peer.drain(), vec![vec![1]]);
        delayed.flush().unwrap();
        assert_eq!(peer.drain(), vec![vec![2]]);
        assert_eq!(delayed.held(), 0);
    }

    #[test]
    fn zero_delay_passes_straight_through() {
        let (conn, peer) = MemoryConnection::pair();
        let mut delayed = DelayedConnection::new(conn, 0);
        delayed.send(vec![7]).unwrap();
        assert_eq!(peer.drain(), vec![vec![7]]);
    }

    #[test]
    fn close_releases_held_frames() {
        let (conn, peer) = MemoryConnection::pair();
        let mut delayed = DelayedConnection::new(conn, 5);
        delayed.send(vec![1]).unwrap();
        delayed.send(vec![2]).unwrap();
        delayed.close("kicked");

        assert_eq!(peer.drain(), vec![vec![1], vec![2]]);
        assert_eq!(peer.close_reason().as_deref(), Some("kicked"));
    }

    #[test]
    fn hung_up_peer_fails_on_release() {
        let (conn, peer) = MemoryConnection::pair();
        let mut delayed = DelayedConnection::new(conn, 1);
        delayed.send(vec![1]).unwrap();
        peer.hang_up();

        delayed.flush().unwrap();
        assert!(matches!(delayed.flush(), Err(TransportError::Closed)));
    }
}
