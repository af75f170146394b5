//! APDU Response handling
//!
//! A Response contains data bytes plus the SW1/SW2 status word.

use super::status::SW;

/// A card response
///
/// # Example
/// ```
/// use usim_emu::apdu::{Response, SW};
///
/// let response = Response::success(vec![0x01, 0x02]);
/// assert!(response.is_okay());
///
/// let error = Response::error(SW::FILE_NOT_FOUND);
/// assert_eq!(error.to_bytes(), vec![0x6A, 0x82]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response data (without status words)
    pub data: Vec<u8>,
    /// Status word 1 (SW1)
    pub sw1: u8,
    /// Status word 2 (SW2)
    pub sw2: u8,
}

impl Response {
    /// Create a new response with data and status word
    pub fn new(data: Vec<u8>, sw: u16) -> Self {
        let [sw1, sw2] = SW::to_bytes(sw);
        Self { data, sw1, sw2 }
    }

    /// Create a success response (0x9000) with data
    pub fn success(data: Vec<u8>) -> Self {
        Self::new(data, SW::SUCCESS)
    }

    /// Create an empty success response (0x9000)
    pub fn ok() -> Self {
        Self::success(Vec::new())
    }

    /// Create an error response (no data)
    pub fn error(sw: u16) -> Self {
        Self::new(Vec::new(), sw)
    }

    /// Check if the response is 0x9000
    pub fn is_okay(&self) -> bool {
        SW::is_success(self.sw())
    }

    /// Get the combined status word as u16
    pub fn sw(&self) -> u16 {
        u16::from_be_bytes([self.sw1, self.sw2])
    }

    /// Convert to raw bytes for transmission (data + SW1 + SW2)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(self.data.len() + 2);
        result.extend_from_slice(&self.data);
        result.push(self.sw1);
        result.push(self.sw2);
        result
    }

    /// Get total length in bytes (data + 2 status bytes)
    pub fn len(&self) -> usize {
        self.data.len() + 2
    }

    /// Check if response has no data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}

impl From<u16> for Response {
    /// Create an error response from a status word
    fn from(sw: u16) -> Self {
        Self::error(sw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response() {
        let resp = Response::success(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(resp.is_okay());
        assert_eq!(resp.sw(), 0x9000);
        assert_eq!(resp.len(), 6);
        assert_eq!(resp.to_bytes(), vec![0xDE, 0xAD, 0xBE, 0xEF, 0x90, 0x00]);
    }

    #[test]
    fn test_ok_response() {
        let resp = Response::ok();
        assert!(resp.is_okay());
        assert!(resp.is_empty());
        assert_eq!(resp.to_bytes(), vec![0x90, 0x00]);
    }

    #[test]
    fn test_error_response() {
        let resp = Response::error(SW::WRONG_P1_P2);
        assert!(!resp.is_okay());
        assert_eq!(resp.sw(), 0x6B00);
        assert_eq!(resp.to_bytes(), vec![0x6B, 0x00]);
    }

    #[test]
    fn test_from_sw() {
        let resp: Response = 0x6A82.into();
        assert_eq!(resp.sw(), SW::FILE_NOT_FOUND);
        assert!(!resp.is_okay());
    }
}
