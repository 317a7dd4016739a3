use std::fmt::Display;

/// Byte capacity of a single TMS or TDI vector.
///
/// This is the value advertised in the `getinfo:` response and the limit enforced
/// on incoming `shift:` commands. 2048 bytes allow up to 16384 bits per shift.
pub const CAPACITY_BYTES: usize = 2048;

/// The version of the protocol.
/// A version always consists of a major and a minor part.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Version {
    major: usize,
    minor: usize,
}

impl Version {
    /// Version 1.0 of the protocol
    pub const V1_0: Version = Version { major: 1, minor: 0 };

    /// Returns the latest supported version
    pub fn latest() -> Version {
        Version::V1_0
    }
}

#[test]
fn version_ordering() {
    assert!(Version { major: 1, minor: 0 } < Version { major: 1, minor: 1 });
    assert!(Version { major: 2, minor: 0 } > Version { major: 1, minor: 0 });
    assert_eq!(Version::latest(), Version::V1_0);
    assert_eq!(Version::latest().to_string(), "1.0");
}

impl Default for Version {
    fn default() -> Self {
        Self::V1_0
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Number of bytes needed to hold `num_bits` bits of a TMS, TDI or TDO vector.
pub fn vector_len(num_bits: u32) -> usize {
    num_bits.div_ceil(8) as usize
}

#[test]
fn vector_len_rounds_up() {
    assert_eq!(vector_len(0), 0);
    assert_eq!(vector_len(1), 1);
    assert_eq!(vector_len(8), 1);
    assert_eq!(vector_len(13), 2);
    assert_eq!(vector_len((CAPACITY_BYTES * 8) as u32), CAPACITY_BYTES);
}

/// A command decoded by the server.
///
/// The shift vectors borrow from buffers owned by the caller, so decoding a command
/// never allocates. A command lives exactly as long as the request it was read from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command<'a> {
    /// `getinfo:`
    GetInfo,
    /// `settck:<period_ns>`
    SetTck { period_ns: u32 },
    /// `shift:<num_bits><tms><tdi>`
    Shift {
        num_bits: u32,
        /// `ceil(num_bits / 8)` bytes, bit `i` at byte `i / 8`, position `i % 8`.
        tms: &'a [u8],
        /// Same length and bit order as `tms`.
        tdi: &'a [u8],
    },
}

/// A Message is transfered from the client to the server.
/// For each message, the client is expected to send the message and wait for a response from the server.
/// The server needs to process each message in the order received and promptly provide a response.
/// For the XVC 1.0 protocol, only one connection is assumed.
///
/// This is the owned counterpart of [`Command`], used on the sending side.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Message {
    /// Requests info from the server. This is used to determine protocol capabilities of the server.
    GetInfo,
    /// Configures the TCK period. When sending JTAG vectors the TCK rate may need to be varied to accomodate cable and board signal integrity conditions.
    /// This command is used by clients to adjust the TCK rate in order to slow down or speed up the shifting of JTAG vectors.
    SetTck { period_ns: u32 },
    /// Used to shift JTAG vectors in-and out of a device.
    Shift {
        /// represents the number of TCK clk toggles needed to shift the vectors out
        num_bits: u32,
        /// a byte sized vector with all the TMS data.
        /// The vector is num_bits and rounds up to the nearest byte.
        tms: Box<[u8]>,
        /// a byte sized vector with all the TDI data.
        /// The vector is num_bits and rounds up to the nearest byte.
        tdi: Box<[u8]>,
    },
}

impl Message {
    /// Borrows this message as a [`Command`].
    pub fn as_command(&self) -> Command<'_> {
        match self {
            Message::GetInfo => Command::GetInfo,
            Message::SetTck { period_ns } => Command::SetTck {
                period_ns: *period_ns,
            },
            Message::Shift { num_bits, tms, tdi } => Command::Shift {
                num_bits: *num_bits,
                tms,
                tdi,
            },
        }
    }
}

/// Contains static information about the server capabilities that are transfered between
/// client and server in the beginning.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct XvcInfo {
    version: Version,
    max_vector_len: u32,
}

impl XvcInfo {
    /// Creates a new info object from version and the maximum receivable vector length.
    pub fn new(version: Version, max_vector_len: u32) -> XvcInfo {
        XvcInfo {
            version,
            max_vector_len,
        }
    }

    /// The version of the protocol
    pub fn version(&self) -> Version {
        self.version
    }

    /// the max width of the vector that can be shifted into the server, in bytes
    pub fn max_vector_len(&self) -> u32 {
        self.max_vector_len
    }
}

impl Default for XvcInfo {
    fn default() -> XvcInfo {
        XvcInfo {
            version: Version::default(),
            max_vector_len: CAPACITY_BYTES as u32,
        }
    }
}
