#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to resolve {0}: {1}")]
    Resolve(String, std::io::Error),

    #[error("no addresses found for {0}")]
    NoAddress(String),

    #[error("invalid port {0:?}: must be 1-65535")]
    InvalidPort(String),

    #[error("failed to bind local socket: {0}")]
    Bind(std::io::Error),

    #[error("socket error: {0}")]
    Socket(std::io::Error),

    #[error("stdin error: {0}")]
    Stdin(std::io::Error),

    #[error("stdout error: {0}")]
    Stdout(std::io::Error),

    #[error("compressed frame is {0} bytes, exceeds the {1}-byte wire ceiling")]
    FrameTooLarge(usize, usize),
}
