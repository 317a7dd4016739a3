use std::{
    io,
    net::{Shutdown, TcpListener, TcpStream, ToSocketAddrs},
    time::Duration,
};

use xvc_protocol::CAPACITY_BYTES;

use crate::{XvcServer, error::SessionError, session::Session};

#[derive(Debug, Clone)]
pub struct Config {
    /// Largest TMS/TDI vector in bytes. Also the value advertised by `getinfo:`.
    pub max_vector_size: u32,
    /// `None` lets a silent client hold the connection until the transport gives up.
    pub read_write_timeout: Option<Duration>,
    pub nodelay: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_vector_size: CAPACITY_BYTES as u32,
            read_write_timeout: None,
            nodelay: true,
        }
    }
}

#[derive(Debug)]
pub struct Server<T: XvcServer> {
    server: T,
    config: Config,
}

/// Builder to create a [Server] instance and modify configuration options
///
/// # Example
///
/// ```ignore
/// use xvc_server::server::Builder;
/// use std::time::Duration;
///
/// let server = Builder::new()
///     .max_vector_size(1024)
///     .rw_timeout(Duration::from_secs(20))
///     .build(my_server);
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the highest vector size that this server is expected to receive.
    pub fn max_vector_size(mut self, size: u32) -> Self {
        self.config.max_vector_size = size;
        self
    }

    /// Set the TCP read and write timeout. A zero duration disables the timeout.
    pub fn rw_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_write_timeout = Some(timeout).filter(|t| !t.is_zero());
        self
    }

    /// Enable or disable `TCP_NODELAY` on accepted connections
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.config.nodelay = nodelay;
        self
    }

    /// Build and return the server
    pub fn build<T: XvcServer>(self, server: T) -> Server<T> {
        Server::new(server, self.config)
    }
}

impl<T: XvcServer> Server<T> {
    pub fn new(server: T, config: Config) -> Server<T> {
        Server { server, config }
    }

    /// Binds to `addr` and serves clients until accepting fails irrecoverably.
    pub fn listen(&mut self, addr: impl ToSocketAddrs) -> io::Result<()> {
        let listener = TcpListener::bind(addr)?;
        self.serve(listener)
    }

    /// Serves clients from an already bound listener, one at a time.
    ///
    /// Errors of individual clients are logged and never end the loop.
    pub fn serve(&mut self, listener: TcpListener) -> io::Result<()> {
        log::info!(
            "Server listening for connections on {}",
            listener.local_addr()?
        );

        for stream in listener.incoming() {
            match stream {
                Ok(tcp) => {
                    let peer_addr = tcp.peer_addr().ok();
                    if let Some(addr) = peer_addr {
                        log::info!("New client connection from {}", addr);
                    }
                    match self.handle_client(tcp) {
                        Ok(()) => log::info!("Client session finished"),
                        Err(e) => log::error!("Client error: {}", e),
                    }
                }
                Err(e) => log::error!("Connection error: {}", e),
            }
        }
        Ok(())
    }

    fn handle_client(&mut self, tcp: TcpStream) -> Result<(), SessionError> {
        if let Err(e) = tcp.set_nodelay(self.config.nodelay) {
            log::warn!("Could not set TCP_NODELAY: {}", e);
        }
        tcp.set_read_timeout(self.config.read_write_timeout)?;
        tcp.set_write_timeout(self.config.read_write_timeout)?;

        let mut session = Session::new(tcp, self.config.max_vector_size as usize);
        let result = session.run(&mut self.server);
        // Wakes the client up immediately, also when the session ended on an error.
        let _ = session.into_inner().shutdown(Shutdown::Both);
        result
    }
}
