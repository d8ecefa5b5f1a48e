//! The receiver's control loop: validate incoming frames, buffer
//! out-of-order payloads, and emit byte-exact in-order output with
//! cumulative acknowledgements.

use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::net::{SocketAddr, UdpSocket};

use log::{debug, info, warn};

use super::{AckFrame, DataFrame};
use crate::Error;

pub struct Receiver {
    expected: u16,
    reorder_buffer: BTreeMap<u16, Vec<u8>>,
    rx_nonces_seen: HashSet<u16>,
    tx_nonce: u16,
    peer: Option<SocketAddr>,
}

impl Default for Receiver {
    fn default() -> Self {
        Receiver {
            expected: 1,
            reorder_buffer: BTreeMap::new(),
            rx_nonces_seen: HashSet::new(),
            tx_nonce: 0,
            peer: None,
        }
    }
}

impl Receiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks forever, writing delivered bytes to `output`. The receiver
    /// never exits on its own; it is killed by its parent once the sender
    /// has finished.
    pub fn run(&mut self, socket: &UdpSocket, output: &mut dyn Write) -> Result<(), Error> {
        let mut buf = [0u8; super::MAX_DATAGRAM];

        loop {
            let (n, from) = socket.recv_from(&mut buf).map_err(Error::Socket)?;

            match self.peer {
                None => {
                    info!("latched peer address {from}");
                    self.peer = Some(from);
                }
                Some(peer) if peer != from => {
                    warn!("ignoring datagram from unexpected peer {from} (expected {peer})");
                    continue;
                }
                Some(_) => {}
            }

            let Some(frame) = DataFrame::decode(&buf[..n]) else {
                debug!("discarding malformed or corrupt frame ({n} bytes)");
                continue;
            };

            if !self.rx_nonces_seen.insert(frame.nonce) {
                debug!("discarding duplicate nonce {}", frame.nonce);
                continue;
            }

            self.accept(frame.seq, frame.payload, output)?;
            self.send_ack(socket)?;
        }
    }

    fn accept(&mut self, seq: u16, payload: Vec<u8>, output: &mut dyn Write) -> Result<(), Error> {
        if seq == self.expected {
            output.write_all(&payload).map_err(Error::Stdout)?;
            self.expected = self.expected.wrapping_add(1);

            while let Some(buffered) = self.reorder_buffer.remove(&self.expected) {
                output.write_all(&buffered).map_err(Error::Stdout)?;
                self.expected = self.expected.wrapping_add(1);
            }
        } else if seq > self.expected {
            self.reorder_buffer.insert(seq, payload);
        }
        // seq < expected: already delivered, no output action.

        Ok(())
    }

    fn send_ack(&mut self, socket: &UdpSocket) -> Result<(), Error> {
        let ack = AckFrame {
            nonce: self.tx_nonce,
            seq_lo: self.expected.wrapping_sub(1) as u8,
        };
        self.tx_nonce = self.tx_nonce.wrapping_add(1);

        let peer = self.peer.expect("send_ack called before a peer was latched");
        socket.send_to(&ack.encode(), peer).map_err(Error::Socket)?;
        Ok(())
    }
}
