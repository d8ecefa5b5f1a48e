//! The sender's control loop: admit segments from stdin, process inbound
//! acks, and drive the retransmission timer. A single cooperative loop,
//! no threads, no locks — see the concurrency notes in the crate root.

use std::collections::{BTreeMap, HashSet};
use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, UdpSocket};
use std::os::fd::AsRawFd;
use std::time::Instant;

use log::{debug, info, warn};
use nix::poll::{poll, PollFd, PollFlags};

use super::congestion::effective_window;
use super::{AckFrame, CongestionController, DataFrame, CHUNK_SIZE, POLL_TIMEOUT_MS, STATIC_MAX_WINDOW};
use crate::Error;

pub struct Sender {
    base: u16,
    next_seq: u16,
    window: BTreeMap<u16, Vec<u8>>,
    sent_times: BTreeMap<u16, Instant>,
    cc: CongestionController,
    ack_nonces_seen: HashSet<u16>,
    tx_nonce: u16,
    last_transmit: Instant,
    eof: bool,
    peer: SocketAddr,
}

impl Sender {
    pub fn new(peer: SocketAddr) -> Self {
        Sender {
            base: 1,
            next_seq: 1,
            window: BTreeMap::new(),
            sent_times: BTreeMap::new(),
            cc: CongestionController::new(),
            ack_nonces_seen: HashSet::new(),
            tx_nonce: 0,
            last_transmit: Instant::now(),
            eof: false,
            peer,
        }
    }

    /// Runs until every byte of `input` has been transmitted and
    /// acknowledged. `socket` must already be connected to `self.peer`.
    pub fn run(&mut self, socket: &UdpSocket, input: &mut dyn Read) -> Result<(), Error> {
        socket.set_nonblocking(true).map_err(Error::Socket)?;
        let raw_fd = socket.as_raw_fd();

        let mut read_buf = vec![0u8; CHUNK_SIZE];
        let mut recv_buf = [0u8; super::MAX_DATAGRAM];

        loop {
            self.admit(socket, input, &mut read_buf)?;

            let mut pfd = [PollFd::new(raw_fd, PollFlags::POLLIN)];
            poll(&mut pfd[..], POLL_TIMEOUT_MS).map_err(|e| {
                Error::Socket(std::io::Error::from_raw_os_error(e as i32))
            })?;

            self.drain_acks(socket, &mut recv_buf)?;
            self.check_timeout(socket)?;

            if self.eof && self.window.is_empty() {
                info!("all {} segment(s) acknowledged, exiting", self.next_seq - 1);
                return Ok(());
            }
        }
    }

    fn admit(
        &mut self,
        socket: &UdpSocket,
        input: &mut dyn Read,
        read_buf: &mut [u8],
    ) -> Result<(), Error> {
        let static_max = STATIC_MAX_WINDOW as u32;

        while !self.eof
            && (self.next_seq as u32)
                < self.base as u32 + effective_window(self.cc.window(), static_max)
        {
            let n = input.read(read_buf).map_err(Error::Stdin)?;
            if n == 0 {
                self.eof = true;
                break;
            }

            let seq = self.next_seq;
            let payload = read_buf[..n].to_vec();
            self.transmit(socket, seq, &payload)?;

            self.window.insert(seq, payload);
            self.sent_times.insert(seq, Instant::now());
            self.next_seq = self.next_seq.wrapping_add(1);
        }

        Ok(())
    }

    fn transmit(&mut self, socket: &UdpSocket, seq: u16, payload: &[u8]) -> Result<(), Error> {
        let frame = DataFrame {
            nonce: self.tx_nonce,
            seq,
            payload: payload.to_vec(),
        };
        self.tx_nonce = self.tx_nonce.wrapping_add(1);

        let wire = frame.encode()?;
        socket.send(&wire).map_err(Error::Socket)?;

        debug!("sent seq={seq} ({} bytes on wire)", wire.len());
        Ok(())
    }

    fn drain_acks(&mut self, socket: &UdpSocket, recv_buf: &mut [u8]) -> Result<(), Error> {
        loop {
            let n = match socket.recv(recv_buf) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(Error::Socket(e)),
            };

            let Some(ack) = AckFrame::decode(&recv_buf[..n]) else {
                warn!("discarding malformed ack ({n} bytes)");
                continue;
            };

            if !self.ack_nonces_seen.insert(ack.nonce) {
                continue;
            }

            let acked = reconstruct_seq(self.base, ack.seq_lo);
            self.process_ack(socket, acked)?;
        }
    }

    fn process_ack(&mut self, socket: &UdpSocket, acked: u16) -> Result<(), Error> {
        if acked >= self.base {
            let retired: Vec<u16> = self
                .window
                .range(..=acked)
                .map(|(&seq, _)| seq)
                .collect();

            for seq in &retired {
                self.window.remove(seq);
            }

            if let Some(sent_at) = self.sent_times.remove(&acked) {
                self.cc.sample_rtt(sent_at.elapsed().as_secs_f64());
            }
            for seq in &retired {
                self.sent_times.remove(seq);
            }

            self.base = acked.wrapping_add(1);
            self.cc.on_advancing_ack();
            self.last_transmit = Instant::now();
        } else {
            if self.cc.on_duplicate_ack() {
                info!(
                    "fast retransmit: seq={} cwnd={} ssthresh={}",
                    self.base, self.cc.cwnd, self.cc.ssthresh
                );
                self.sent_times.remove(&self.base);
                if let Some(payload) = self.window.get(&self.base).cloned() {
                    self.transmit(socket, self.base, &payload)?;
                }
            }
        }

        self.cc.on_ack_processed();
        Ok(())
    }

    fn check_timeout(&mut self, socket: &UdpSocket) -> Result<(), Error> {
        if self.window.is_empty() {
            return Ok(());
        }

        if self.last_transmit.elapsed().as_secs_f64() <= self.cc.timeout_interval() {
            return Ok(());
        }

        info!(
            "retransmission timeout: cwnd={} -> 1, ssthresh={} -> {}",
            self.cc.cwnd,
            self.cc.ssthresh,
            self.cc.cwnd / 2
        );

        self.cc.on_timeout();
        self.last_transmit = Instant::now();

        let pending: Vec<(u16, Vec<u8>)> = self
            .window
            .range(self.base..self.next_seq)
            .map(|(&seq, payload)| (seq, payload.clone()))
            .collect();

        for (seq, payload) in pending {
            self.sent_times.remove(&seq);
            self.transmit(socket, seq, &payload)?;
        }

        Ok(())
    }
}

/// Reconstructs a full 16-bit sequence number from the 8 low bits carried
/// on the wire, picking whichever of the three nearest candidates
/// (`reference`'s high byte, one above, one below) lands closest to
/// `reference`. See the open question on the ack's truncated sequence
/// field: this is only unambiguous while the window stays under ~128
/// segments wide of `reference`.
fn reconstruct_seq(reference: u16, low: u8) -> u16 {
    let base_high = reference & 0xff00;
    let candidate = base_high | low as u16;

    [
        candidate.wrapping_sub(256),
        candidate,
        candidate.wrapping_add(256),
    ]
    .into_iter()
    .min_by_key(|&c| (c as i32 - reference as i32).abs())
    .expect("non-empty candidate list")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconstructs_nearby_sequence_without_wrap() {
        assert_eq!(reconstruct_seq(300, 44), 300);
        assert_eq!(reconstruct_seq(10, 9), 9);
    }

    #[test]
    fn reconstructs_across_a_byte_boundary() {
        // reference just past a 256-boundary, ack for a seq just before it
        assert_eq!(reconstruct_seq(257, 255), 255);
        assert_eq!(reconstruct_seq(254, 2), 258);
    }
}
