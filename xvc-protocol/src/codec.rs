/// Read and write implementations for the protocol messages
use std::io::{self, ErrorKind, Read, Write};

use crate::{
    error::ReadError,
    protocol::{Command, Message, Version, XvcInfo, vector_len},
};

const XVC_INFO_PREFIX: &[u8] = b"xvcServer_v";
/// Longest info line accepted by [`XvcInfo::from_reader`], newline included.
const XVC_INFO_MAX_LEN: usize = 64;

/// Fills `buf` completely from `reader`, accumulating as many short reads as necessary.
///
/// Returns `ErrorKind::UnexpectedEof` if the stream ends first and any other error as
/// soon as a read fails. Interrupted reads are retried. After a failure the contents
/// of `buf` are unspecified.
pub fn read_frame(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("stream ended after {} of {} bytes", filled, buf.len()),
                ));
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

impl XvcInfo {
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        writeln!(
            writer,
            "xvcServer_v{}:{}",
            self.version(),
            self.max_vector_len()
        )
    }

    /// Reads the info line byte by byte so that nothing past the newline is consumed.
    pub fn from_reader(reader: &mut impl Read) -> Result<XvcInfo, ReadError> {
        let mut line = Vec::with_capacity(32);
        loop {
            let mut byte = [0u8; 1];
            read_frame(reader, &mut byte)?;
            if byte[0] == b'\n' {
                break;
            }
            if line.len() == XVC_INFO_MAX_LEN {
                return Err(ReadError::InvalidFormat(
                    "Info message is not terminated".to_string(),
                ));
            }
            line.push(byte[0]);
        }

        // Parse format: "xvcServer_v{version}:{max_vector_len_bytes}"
        let line = line
            .trim_ascii_end()
            .strip_prefix(XVC_INFO_PREFIX)
            .ok_or_else(|| ReadError::InvalidFormat("Invalid prefix in info message".to_string()))?;

        let colon_index = line.iter().position(|l| *l == b':').ok_or_else(|| {
            ReadError::InvalidFormat("Missing ':' separator in info message".to_string())
        })?;
        let (version_part, rest) = line.split_at(colon_index);

        let version = match version_part {
            b"1.0" => Version::V1_0,
            _ => {
                return Err(ReadError::UnsupportedVersion(
                    String::from_utf8_lossy(version_part).to_string(),
                ));
            }
        };

        let max_vector_len = str::from_utf8(&rest[1..])?.parse::<u32>()?;

        Ok(XvcInfo::new(version, max_vector_len))
    }
}

#[test]
fn write_server_info() {
    let mut out = Vec::new();
    XvcInfo::default().write_to(&mut out).unwrap();
    assert_eq!(out, b"xvcServer_v1.0:2048\n".to_vec());
}

#[test]
fn read_server_info() {
    let data = b"xvcServer_v1.0:32\n";
    let mut cursor = std::io::Cursor::new(data);
    let info = XvcInfo::from_reader(&mut cursor).unwrap();
    assert_eq!(info.version(), Version::V1_0);
    assert_eq!(info.max_vector_len(), 32)
}

#[test]
fn read_server_info_leaves_trailing_bytes() {
    let data = b"xvcServer_v1.0:4096\nrest";
    let mut cursor = std::io::Cursor::new(data);
    let info = XvcInfo::from_reader(&mut cursor).unwrap();
    assert_eq!(info.max_vector_len(), 4096);
    assert_eq!(cursor.position(), 20);
}

const CMD_NAME_GET_INFO: &[u8] = b"getinfo:";
const CMD_NAME_SET_TCK: &[u8] = b"settck:";
const CMD_NAME_SHIFT: &[u8] = b"shift:";

/// Only the first two bytes of a command name select the command. The rest of the name
/// is consumed without being enforced, matching what existing XVC servers accept.
fn check_name(received: &[u8], expected: &[u8]) {
    if received != expected {
        log::warn!(
            "Unexpected command name '{}', treating it as '{}'",
            received.escape_ascii(),
            expected.escape_ascii()
        );
    }
}

impl<'a> Command<'a> {
    /// Reads the next command from `reader`.
    ///
    /// For `shift:` the vectors are read into `tms_buf` and `tdi_buf`, whose length is the
    /// maximum vector size. A shift that does not fit is rejected with
    /// [`ReadError::TooManyBytes`] before any vector byte is consumed.
    ///
    /// If the stream ends (or is reset) while waiting for the command tag,
    /// [`ReadError::Disconnected`] is returned.
    pub fn from_reader(
        reader: &mut impl Read,
        tms_buf: &'a mut [u8],
        tdi_buf: &'a mut [u8],
    ) -> Result<Command<'a>, ReadError> {
        // Large enough for "settck:" + period
        let mut buf = [0u8; 11];
        read_frame(reader, &mut buf[..2]).map_err(|err| match err.kind() {
            ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted => ReadError::Disconnected,
            _ => ReadError::IoError(err),
        })?;

        match &buf[..2] {
            b"ge" => {
                read_frame(reader, &mut buf[2..CMD_NAME_GET_INFO.len()])?;
                check_name(&buf[..CMD_NAME_GET_INFO.len()], CMD_NAME_GET_INFO);
                Ok(Command::GetInfo)
            }
            b"se" => {
                let end = CMD_NAME_SET_TCK.len() + 4;
                read_frame(reader, &mut buf[2..end])?;
                check_name(&buf[..CMD_NAME_SET_TCK.len()], CMD_NAME_SET_TCK);
                let period_ns = u32::from_le_bytes([buf[7], buf[8], buf[9], buf[10]]);
                Ok(Command::SetTck { period_ns })
            }
            b"sh" => {
                let end = CMD_NAME_SHIFT.len() + 4;
                read_frame(reader, &mut buf[2..end])?;
                check_name(&buf[..CMD_NAME_SHIFT.len()], CMD_NAME_SHIFT);
                let num_bits = u32::from_le_bytes([buf[6], buf[7], buf[8], buf[9]]);

                let num_bytes = vector_len(num_bits);
                let max = tms_buf.len().min(tdi_buf.len());
                if num_bytes > max {
                    return Err(ReadError::TooManyBytes {
                        max,
                        got: num_bytes,
                    });
                }
                read_frame(reader, &mut tms_buf[..num_bytes])?;
                read_frame(reader, &mut tdi_buf[..num_bytes])?;
                Ok(Command::Shift {
                    num_bits,
                    tms: &tms_buf[..num_bytes],
                    tdi: &tdi_buf[..num_bytes],
                })
            }
            prefix => Err(ReadError::InvalidCommandPrefix(
                prefix.escape_ascii().to_string(),
            )),
        }
    }
}

impl Message {
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        match self {
            Message::GetInfo => writer.write_all(CMD_NAME_GET_INFO),
            Message::SetTck { period_ns } => {
                writer.write_all(CMD_NAME_SET_TCK)?;
                writer.write_all(&period_ns.to_le_bytes())
            }
            Message::Shift { num_bits, tms, tdi } => {
                writer.write_all(CMD_NAME_SHIFT)?;
                writer.write_all(&num_bits.to_le_bytes())?;
                writer.write_all(tms)?;
                writer.write_all(tdi)
            }
        }
    }
}
