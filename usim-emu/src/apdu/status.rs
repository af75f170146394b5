//! Status Word (SW) constants for APDU responses
//!
//! ISO 7816-4 status words returned by the file system commands.

/// Status Word constants
pub struct SW;

impl SW {
    // Success
    pub const SUCCESS: u16 = 0x9000;

    // Checking errors
    pub const WRONG_LENGTH: u16 = 0x6700;

    pub const SECURITY_STATUS_NOT_SATISFIED: u16 = 0x6982;
    pub const CONDITIONS_NOT_SATISFIED: u16 = 0x6985;
    pub const COMMAND_NOT_ALLOWED_NO_EF: u16 = 0x6986;

    pub const FUNCTION_NOT_SUPPORTED: u16 = 0x6A81;
    pub const FILE_NOT_FOUND: u16 = 0x6A82;
    pub const RECORD_NOT_FOUND: u16 = 0x6A83;

    pub const WRONG_P1_P2: u16 = 0x6B00;

    pub const INS_NOT_SUPPORTED: u16 = 0x6D00;
    pub const CLA_NOT_SUPPORTED: u16 = 0x6E00;

    /// Human readable meaning of a status word, for logs
    pub fn name(sw: u16) -> Option<&'static str> {
        let name = match sw {
            Self::SUCCESS => "Success",
            Self::WRONG_LENGTH => "Wrong length",
            Self::SECURITY_STATUS_NOT_SATISFIED => "Security status not satisfied",
            Self::CONDITIONS_NOT_SATISFIED => "Conditions not satisfied",
            Self::COMMAND_NOT_ALLOWED_NO_EF => "Command not allowed",
            Self::FUNCTION_NOT_SUPPORTED => "Function not supported",
            Self::FILE_NOT_FOUND => "File not found",
            Self::RECORD_NOT_FOUND => "Record not found",
            Self::WRONG_P1_P2 => "Wrong P1/P2",
            Self::INS_NOT_SUPPORTED => "INS not supported",
            Self::CLA_NOT_SUPPORTED => "CLA not supported",
            _ => return None,
        };
        Some(name)
    }

    /// Check if a status word indicates success
    #[inline]
    pub fn is_success(sw: u16) -> bool {
        sw == Self::SUCCESS
    }

    /// Split a status word into its SW1, SW2 bytes
    #[inline]
    pub fn to_bytes(sw: u16) -> [u8; 2] {
        sw.to_be_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(SW::name(0x9000), Some("Success"));
        assert_eq!(SW::name(0x6A82), Some("File not found"));
        assert_eq!(SW::name(0x6986), Some("Command not allowed"));
        assert_eq!(SW::name(0x6F00), None);
    }

    #[test]
    fn test_is_success() {
        assert!(SW::is_success(0x9000));
        assert!(!SW::is_success(0x6982));
    }

    #[test]
    fn test_to_bytes() {
        assert_eq!(SW::to_bytes(SW::INS_NOT_SUPPORTED), [0x6D, 0x00]);
        assert_eq!(SW::to_bytes(SW::RECORD_NOT_FOUND), [0x6A, 0x83]);
    }
}
