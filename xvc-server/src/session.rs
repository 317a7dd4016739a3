use std::io::{ErrorKind, Read, Write};

use xvc_protocol::{Command, Version, XvcInfo, error::ReadError, vector_len};

use crate::{XvcServer, error::SessionError};

/// Room for `xvcServer_v1.0:<u32::MAX>\n`
const INFO_LINE_MAX: usize = 32;

/// Writes all of `buf`, continuing after partial writes.
///
/// A write that accepts no bytes at all ends with [`SessionError::ShortWrite`].
pub fn write_frame(writer: &mut impl Write, buf: &[u8]) -> Result<(), SessionError> {
    let mut sent = 0;
    while sent < buf.len() {
        match writer.write(&buf[sent..]) {
            Ok(0) => {
                return Err(SessionError::ShortWrite {
                    sent,
                    expected: buf.len(),
                });
            }
            Ok(n) => sent += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(SessionError::Transport(err)),
        }
    }
    Ok(())
}

/// State of one client connection.
///
/// The vector buffers are allocated once when the session starts and reused for every
/// `shift:` command, so processing a command never allocates. Only one session exists
/// at a time, which gives it exclusive use of the buffers and of the JTAG backend.
pub struct Session<S> {
    stream: S,
    tms: Box<[u8]>,
    tdi: Box<[u8]>,
    tdo: Box<[u8]>,
}

impl<S: Read + Write> Session<S> {
    /// Creates a session accepting shift vectors of up to `capacity` bytes.
    pub fn new(stream: S, capacity: usize) -> Session<S> {
        Session {
            stream,
            tms: vec![0; capacity].into_boxed_slice(),
            tdi: vec![0; capacity].into_boxed_slice(),
            tdo: vec![0; capacity].into_boxed_slice(),
        }
    }

    /// Largest shift vector, in bytes, this session accepts.
    pub fn capacity(&self) -> usize {
        self.tms.len()
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Processes commands until the client disconnects or an error ends the session.
    ///
    /// A client closing the connection between two commands is a regular end of the
    /// session and returns `Ok(())`.
    pub fn run<T: XvcServer + ?Sized>(&mut self, server: &mut T) -> Result<(), SessionError> {
        let max_vector_len = self.capacity() as u32;
        loop {
            let command = match Command::from_reader(&mut self.stream, &mut self.tms, &mut self.tdi)
            {
                Ok(command) => command,
                Err(ReadError::Disconnected) => {
                    log::info!("Client closed the connection");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };

            match command {
                Command::GetInfo => {
                    log::info!("Received GetInfo message");
                    let mut line = [0u8; INFO_LINE_MAX];
                    let mut cursor = &mut line[..];
                    XvcInfo::new(Version::latest(), max_vector_len).write_to(&mut cursor)?;
                    let len = INFO_LINE_MAX - cursor.len();
                    write_frame(&mut self.stream, &line[..len])?;
                    log::debug!("Sent XVC info response");
                }
                Command::SetTck { period_ns } => {
                    log::debug!("Received SetTck message: period_ns={}", period_ns);
                    let ret_period = server.set_tck(period_ns);
                    log::debug!("Set TCK returned: period_ns={}", ret_period);
                    write_frame(&mut self.stream, &ret_period.to_le_bytes())?;
                }
                Command::Shift { num_bits, tms, tdi } => {
                    log::debug!(
                        "Received Shift message: num_bits={}, num_bytes={}",
                        num_bits,
                        tms.len()
                    );
                    log::trace!("Shift TMS data: {:02x?}", tms);
                    log::trace!("Shift TDI data: {:02x?}", tdi);
                    let tdo = &mut self.tdo[..vector_len(num_bits)];
                    server.shift(num_bits, tms, tdi, tdo);
                    log::trace!("Shift result TDO data: {:02x?}", tdo);
                    write_frame(&mut self.stream, tdo)?;
                }
            }
        }
    }
}
