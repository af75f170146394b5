//! INS → handler routing
//!
//! The instruction table is built once and never changes. Anything not in
//! the table gets 6D00 without touching the session.

use std::collections::HashMap;

use log::{debug, warn};
use once_cell::sync::Lazy;

use crate::apdu::{ins, parse_apdu, Response, APDU, SW};

use super::handlers::{handle_read_binary, handle_read_record, handle_select};
use super::session::CardSession;

/// A command handler: session + command in, response out
pub type Handler = fn(&mut CardSession, &APDU) -> Response;

static HANDLERS: Lazy<HashMap<u8, Handler>> = Lazy::new(|| {
    let mut handlers: HashMap<u8, Handler> = HashMap::new();
    handlers.insert(ins::SELECT_FILE, handle_select);
    handlers.insert(ins::READ_BINARY, handle_read_binary);
    handlers.insert(ins::READ_RECORD, handle_read_record);
    handlers
});

/// Look up the handler registered for an instruction byte
pub fn handler_for(ins: u8) -> Option<Handler> {
    HANDLERS.get(&ins).copied()
}

/// Route a parsed command to its handler
pub fn dispatch_apdu(session: &mut CardSession, cmd: &APDU) -> Response {
    match handler_for(cmd.ins) {
        Some(handler) => handler(session, cmd),
        None => {
            warn!("Unknown instruction: {:02X}", cmd.ins);
            Response::error(SW::INS_NOT_SUPPORTED)
        }
    }
}

/// Decode raw command bytes, run the command and return `data || SW1 SW2`.
///
/// Never fails: undecodable commands are answered with 6700.
pub fn dispatch(session: &mut CardSession, raw: &[u8]) -> Vec<u8> {
    let cmd = match parse_apdu(raw) {
        Ok(cmd) => cmd,
        Err(e) => {
            warn!("Failed to parse APDU {:02X?}: {}", raw, e);
            return Response::error(SW::WRONG_LENGTH).to_bytes();
        }
    };

    debug!(
        "Processing APDU: CLA={:02X} INS={:02X} P1={:02X} P2={:02X} Lc={} Le={:?}",
        cmd.cla, cmd.ins, cmd.p1, cmd.p2, cmd.lc, cmd.le
    );

    let response = dispatch_apdu(session, &cmd);
    debug!(
        "SW {:04X} ({}), {} data bytes",
        response.sw(),
        SW::name(response.sw()).unwrap_or("unknown"),
        response.data.len()
    );
    response.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::{FileTree, TransparentEf, MF_FID};
    use std::sync::Arc;

    fn session() -> CardSession {
        let mut tree = FileTree::new(MF_FID, "MF");
        let mf = tree.root();
        tree.add_child(mf, 0x2FE2, "EF_ICCID", TransparentEf::new(vec![0; 10]))
            .unwrap();
        CardSession::new(Arc::new(tree))
    }

    #[test]
    fn test_select_mf_scenario() {
        let mut session = session();
        assert_eq!(dispatch(&mut session, &[0x00, 0xA4, 0x00, 0x0C, 0x02, 0x2F, 0xE2]), vec![0x90, 0x00]);
        assert_ne!(session.current_file(), session.tree().root());

        let resp = dispatch(&mut session, &[0x00, 0xA4, 0x00, 0x0C, 0x02, 0x3F, 0x00]);
        assert_eq!(resp, vec![0x90, 0x00]);
        assert_eq!(session.current_file(), session.tree().root());
        assert_eq!(session.current_container(), session.tree().root());
    }

    #[test]
    fn test_read_ten_zero_bytes_scenario() {
        let mut session = session();
        dispatch(&mut session, &[0x00, 0xA4, 0x00, 0x0C, 0x02, 0x2F, 0xE2]);
        let resp = dispatch(&mut session, &[0x00, 0xB0, 0x00, 0x00, 0x0A]);
        let mut expected = vec![0x00; 10];
        expected.extend_from_slice(&[0x90, 0x00]);
        assert_eq!(resp, expected);
    }

    #[test]
    fn test_unknown_instruction() {
        let mut session = session();
        let frames: [&[u8]; 4] = [
            &[0x00, 0x99, 0x00, 0x00],
            &[0x80, 0x99, 0xFF, 0xFF, 0x10],
            &[0x00, 0x99, 0x01, 0x02, 0x02, 0xAA, 0xBB],
            &[0xFF, 0x99, 0x00, 0x00, 0x01, 0x00, 0x00],
        ];
        for frame in frames {
            assert_eq!(dispatch(&mut session, frame), vec![0x6D, 0x00]);
        }
        assert_eq!(session.current_file(), session.tree().root());
    }

    #[test]
    fn test_malformed_apdu_is_wrong_length() {
        let mut session = session();
        assert_eq!(dispatch(&mut session, &[0x00, 0xA4]), vec![0x67, 0x00]);
        assert_eq!(
            dispatch(&mut session, &[0x00, 0xA4, 0x00, 0x0C, 0x05, 0x3F, 0x00]),
            vec![0x67, 0x00]
        );
        assert_eq!(
            dispatch(&mut session, &[0x00, 0xA4, 0x00, 0x0C, 0x02, 0x3F, 0x00, 0x00, 0x00]),
            vec![0x67, 0x00]
        );
    }

    #[test]
    fn test_handler_table() {
        assert!(handler_for(0xA4).is_some());
        assert!(handler_for(0xB0).is_some());
        assert!(handler_for(0xB2).is_some());
        assert!(handler_for(0xD6).is_none());
    }
}
