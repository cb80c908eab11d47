use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::TransportError;

/// One open link to a peer. The embedder owns the socket and reports
/// incoming frames and closes to the server or client core.
pub trait Connection {
    fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError>;

    /// Called by the server once per step, after the step's frames were
    /// sent.
    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn close(&mut self, reason: &str);
}

#[derive(Debug, Default)]
struct MemoryLink {
    frames: VecDeque<Vec<u8>>,
    closed: Option<String>,
}

/// In-process connection: frames sent through it queue up on the paired
/// [`MemoryPeer`].
#[derive(Debug)]
pub struct MemoryConnection {
    link: Rc<RefCell<MemoryLink>>,
}

/// Receiving end of a [`MemoryConnection`].
#[derive(Debug, Clone)]
pub struct MemoryPeer {
    link: Rc<RefCell<MemoryLink>>,
}

impl MemoryConnection {
    pub fn pair() -> (MemoryConnection, MemoryPeer) {
        let link = Rc::new(RefCell::new(MemoryLink::default()));
        (
            MemoryConnection {
                link: Rc::clone(&link),
            },
            MemoryPeer { link },
        )
    }
}

impl Connection for MemoryConnection {
    fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        let mut link = self.link.borrow_mut();
        if link.closed.is_some() {
            return Err(TransportError::Closed);
        }
        link.frames.push_back(frame);
        Ok(())
    }

    fn close(&mut self, reason: &str) {
        let mut link = self.link.borrow_mut();
        if link.closed.is_none() {
            link.closed = Some(reason.to_owned());
        }
    }
}

impl MemoryPeer {
    pub fn drain(&self) -> Vec<Vec<u8>> {
        self.link.borrow_mut().frames.drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.link.borrow().frames.len()
    }

    pub fn is_closed(&self) -> bool {
        self.link.borrow().closed.is_some()
    }

    pub fn close_reason(&self) -> Option<String> {
        self.link.borrow().closed.clone()
    }

    /// Closes from the receiving side, as a dropped socket would.
    pub fn hang_up(&self) {
        let mut link = self.link.borrow_mut();
        if link.closed.is_none() {
            link.closed = Some("peer hung up".to_owned());
        }
    }
}
