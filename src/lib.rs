//! A reliable, ordered, byte-stream transport over UDP: sliding-window
//! framing with integrity checks and compression, a TCP-style congestion
//! and retransmission controller, and a receiver-side reorder buffer with
//! cumulative acknowledgement.
//!
//! The two binaries (`sender`, `receiver`) are thin CLI wrappers around
//! [`proto::Sender`] and [`proto::Receiver`].

mod err;
pub mod proto;

pub use err::Error;

/// Initializes the `env_logger` backend from `RUST_LOG`, defaulting to
/// `info` when unset. Call once, at the top of `main`.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
