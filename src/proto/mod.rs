//! Wire framing, congestion control, and the sender/receiver control loops.
//!
//! Layout mirrors the rest of this crate: one file per concern, a shared
//! `constants` section here at the root of the module.

pub mod congestion;
pub mod frame;
pub mod receiver;
pub mod sender;

pub use congestion::CongestionController;
pub use frame::{AckFrame, DataFrame};
pub use receiver::Receiver;
pub use sender::Sender;

/// Payload bytes read from stdin per segment, before compression.
pub const CHUNK_SIZE: usize = 2500;

/// Static ceiling on outstanding (unacknowledged) segments, independent of `cwnd`.
pub const STATIC_MAX_WINDOW: u32 = 500;

/// Congestion window, in segments.
pub const INITIAL_CWND: u32 = 1;

/// Slow-start threshold, in segments.
pub const INITIAL_SSTHRESH: u32 = 100;

/// Initial retransmission timeout, seconds.
pub const INITIAL_RTO: f64 = 1.0;

/// RTO is scaled by this factor to get the timer's actual firing interval.
pub const TIMEOUT_MULTIPLIER: f64 = 1.2;

/// Weight on the prior RTO estimate in the EWMA update.
pub const RTT_ALPHA: f64 = 0.8;

/// Weight on the new RTT sample in the EWMA update.
pub const RTT_BETA: f64 = 0.2;

/// Consecutive non-advancing acks that trigger fast retransmit.
pub const FAST_RETRANSMIT_THRESHOLD: u32 = 3;

/// Length, in bytes, of the MD5-derived integrity tag prepended to data frames.
pub const INTEGRITY_TAG_LEN: usize = 10;

/// Largest frame (of either kind) the link substrate will carry.
pub const MAX_DATAGRAM: usize = 1500;

/// Exact length of an ack frame.
pub const ACK_FRAME_LEN: usize = 4;

/// Timeout, in milliseconds, for the sender's socket-readability poll.
///
/// Short enough that admission and ack processing stay responsive without
/// a zero-timeout busy loop; see the design notes on scheduling.
pub const POLL_TIMEOUT_MS: i32 = 5;
