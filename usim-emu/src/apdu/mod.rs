//! APDU (Application Protocol Data Unit) handling
//!
//! Short-length ISO 7816-4 command APDUs only. The codec here is the only
//! place in the crate that knows about the wire layout of a command.
//!
//! # Example
//! ```
//! use usim_emu::apdu::{parse_apdu, Response};
//!
//! let apdu = parse_apdu(&[0x00, 0xA4, 0x00, 0x0C, 0x02, 0x3F, 0x00]).unwrap();
//! assert_eq!(apdu.ins, 0xA4);
//! assert_eq!(apdu.data, vec![0x3F, 0x00]);
//! assert_eq!(apdu.le, None);
//!
//! let response = Response::ok();
//! assert_eq!(response.to_bytes(), vec![0x90, 0x00]);
//! ```

mod response;
mod status;

pub use response::Response;
pub use status::SW;

use thiserror::Error;

/// Errors that can occur during APDU parsing
#[derive(Debug, Error, PartialEq)]
pub enum APDUError {
    #[error("APDU too short: expected at least 4 bytes, got {0}")]
    TooShort(usize),

    #[error("Lc exceeds available data: Lc={lc}, {available} data bytes present")]
    LcExceedsData { lc: u8, available: usize },

    #[error("unexpected {0} trailing bytes after command data")]
    TrailingBytes(usize),

    #[error("invalid hex APDU: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("command data too long for short APDU: {0} bytes")]
    DataTooLong(usize),
}

/// A parsed command APDU
///
/// - `cla`: Class byte
/// - `ins`: Instruction byte (the command to execute)
/// - `p1`, `p2`: Parameter bytes (command-specific)
/// - `lc`: Number of command data bytes
/// - `data`: Command data, exactly `lc` bytes
/// - `le`: Expected response length byte as sent (`None` if absent)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct APDU {
    /// Class byte (CLA)
    pub cla: u8,
    /// Instruction byte (INS)
    pub ins: u8,
    /// Parameter 1 (P1)
    pub p1: u8,
    /// Parameter 2 (P2)
    pub p2: u8,
    /// Command data length (Lc)
    pub lc: u8,
    /// Command data (may be empty)
    pub data: Vec<u8>,
    /// Raw Le byte, None if not present. 0x00 is kept as-is.
    pub le: Option<u8>,
}

impl APDU {
    /// Create a new APDU with just the header (CLA, INS, P1, P2)
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            lc: 0,
            data: Vec::new(),
            le: None,
        }
    }

    /// Create a new APDU with command data (at most 255 bytes)
    pub fn with_data(cla: u8, ins: u8, p1: u8, p2: u8, data: Vec<u8>) -> Result<Self, APDUError> {
        let lc = u8::try_from(data.len()).map_err(|_| APDUError::DataTooLong(data.len()))?;
        Ok(Self {
            cla,
            ins,
            p1,
            p2,
            lc,
            data,
            le: None,
        })
    }

    /// Set the Le byte
    pub fn with_le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Get P1-P2 combined as a big-endian u16
    pub fn p1p2(&self) -> u16 {
        ((self.p1 as u16) << 8) | (self.p2 as u16)
    }

    /// Number of bytes the terminal expects back; Le=0x00 means 256.
    pub fn expected_length(&self) -> Option<usize> {
        self.le.map(|le| if le == 0 { 256 } else { le as usize })
    }

    /// Parse an APDU written as hex text, e.g. `"00A4000C023F00"`.
    /// Whitespace anywhere in the string is ignored.
    pub fn from_hex(text: &str) -> Result<Self, APDUError> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let raw = hex::decode(compact)?;
        parse_apdu(&raw)
    }

    /// Encode back into the short wire form: header, then `Lc data` when
    /// data is present, then `Le` when present.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(6 + self.data.len());
        out.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2]);
        if !self.data.is_empty() {
            out.push(self.lc);
            out.extend_from_slice(&self.data);
        }
        if let Some(le) = self.le {
            out.push(le);
        }
        out
    }
}

/// Parse raw bytes into an APDU
///
/// Short format only:
/// - Case 1: CLA INS P1 P2
/// - Case 2: CLA INS P1 P2 Le
/// - Case 3: CLA INS P1 P2 Lc Data
/// - Case 4: CLA INS P1 P2 Lc Data Le
///
/// A 5 byte buffer is always Case 2. From 6 bytes on, byte 4 is Lc.
pub fn parse_apdu(raw: &[u8]) -> Result<APDU, APDUError> {
    if raw.len() < 4 {
        return Err(APDUError::TooShort(raw.len()));
    }

    let header = APDU::new(raw[0], raw[1], raw[2], raw[3]);

    // Case 1
    if raw.len() == 4 {
        return Ok(header);
    }

    // Case 2
    if raw.len() == 5 {
        return Ok(header.with_le(raw[4]));
    }

    let lc = raw[4];
    let body = &raw[5..];
    if body.len() < lc as usize {
        return Err(APDUError::LcExceedsData {
            lc,
            available: body.len(),
        });
    }

    let (data, rest) = body.split_at(lc as usize);
    let apdu = APDU {
        lc,
        data: data.to_vec(),
        ..header
    };

    match rest {
        // Case 3
        [] => Ok(apdu),
        // Case 4
        [le] => Ok(apdu.with_le(*le)),
        _ => Err(APDUError::TrailingBytes(rest.len())),
    }
}

/// Instruction bytes handled by the emulator
pub mod ins {
    pub const SELECT_FILE: u8 = 0xA4;
    pub const READ_BINARY: u8 = 0xB0;
    pub const READ_RECORD: u8 = 0xB2;
}
