use std::io;
use std::net::UdpSocket;
use std::process::ExitCode;

use reluwp::proto::Receiver;
use reluwp::{init_logging, Error};

fn main() -> ExitCode {
    init_logging();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("receiver: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Error> {
    let socket = UdpSocket::bind("0.0.0.0:0").map_err(Error::Bind)?;
    let port = socket.local_addr().map_err(Error::Socket)?.port();

    // The harness parses this exact line to learn our ephemeral port, so it
    // bypasses the `log` facade entirely.
    eprintln!("Bound to port {port}");

    let mut receiver = Receiver::new();
    let stdout = io::stdout();
    let mut lock = stdout.lock();

    receiver.run(&socket, &mut lock)
}
