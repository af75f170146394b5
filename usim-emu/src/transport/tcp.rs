//! TCP listener, one thread per client

use std::io::{self, BufReader};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;

use log::{error, info, warn};

use super::{serve_connection, TransportError};
use crate::card::{SessionHandle, VirtualCard};

/// Accepts clients and runs each conversation on its own thread
#[derive(Debug)]
pub struct TcpServer {
    listener: TcpListener,
    card: VirtualCard,
}

impl TcpServer {
    /// Bind to `addr` (`host:port`; port 0 picks a free port)
    pub fn bind(addr: &str, card: VirtualCard) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).map_err(|source| TransportError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        Ok(Self { listener, card })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept clients forever. Failed accepts are logged and skipped.
    pub fn run(self) -> Result<(), TransportError> {
        info!(
            "USIM emulator listening on {} ({} sessions)",
            self.local_addr()?,
            self.card.policy()
        );
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => self.spawn_client(stream),
                Err(e) => warn!("Failed to accept connection: {}", e),
            }
        }
        Ok(())
    }

    fn spawn_client(&self, stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let session = self.card.open_session();

        let spawned = thread::Builder::new()
            .name(format!("apdu-{}", peer))
            .spawn(move || {
                info!("Client connected from {}", peer);
                if let Err(e) = handle_client(stream, session) {
                    warn!("Connection {} closed with error: {}", peer, e);
                }
                info!("Client disconnected from {}", peer);
            });
        if let Err(e) = spawned {
            error!("Failed to start client thread: {}", e);
        }
    }
}

fn handle_client(stream: TcpStream, mut session: SessionHandle) -> io::Result<()> {
    let reader = BufReader::new(stream.try_clone()?);
    serve_connection(reader, stream, &mut session)
}
