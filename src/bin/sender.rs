use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::process::ExitCode;

use reluwp::proto::Sender;
use reluwp::{init_logging, Error};

fn main() -> ExitCode {
    init_logging();

    let mut args = std::env::args().skip(1);
    let (host, port) = match (args.next(), args.next()) {
        (Some(host), Some(port)) => (host, port),
        _ => {
            eprintln!("usage: sender <host> <port>");
            return ExitCode::FAILURE;
        }
    };

    match run(&host, &port) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sender: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(host: &str, port: &str) -> Result<(), Error> {
    let peer = resolve(host, port)?;

    let socket = UdpSocket::bind("0.0.0.0:0").map_err(Error::Bind)?;
    socket.connect(peer).map_err(Error::Socket)?;
    log::info!("sending to {peer} from local port {}", socket.local_addr().map_err(Error::Socket)?.port());

    let mut sender = Sender::new(peer);
    let stdin = io::stdin();
    let mut lock = stdin.lock();

    sender.run(&socket, &mut lock)
}

fn resolve(host: &str, port: &str) -> Result<SocketAddr, Error> {
    let port: u16 = port
        .parse()
        .ok()
        .filter(|&p: &u16| p != 0)
        .ok_or_else(|| Error::InvalidPort(port.to_string()))?;

    format!("{host}:{port}")
        .to_socket_addrs()
        .map_err(|e| Error::Resolve(host.to_string(), e))?
        .next()
        .ok_or_else(|| Error::NoAddress(host.to_string()))
}
