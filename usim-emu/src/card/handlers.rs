//! File system command handlers
//!
//! Each handler takes the session and a parsed command and always produces
//! a [`Response`]; failures are reported through the status word only.

use log::debug;

use crate::apdu::{Response, APDU, SW};
use crate::filesystem::NodeKind;

use super::session::CardSession;

/// P2 low bits selecting absolute record addressing
const RECORD_MODE_ABSOLUTE: u8 = 0x04;

/// Handle SELECT FILE (INS A4), selection by 2-byte FID only.
///
/// The MF FID always resets to the root. Other FIDs are looked up under the
/// current DF first, then from the MF.
pub fn handle_select(session: &mut CardSession, cmd: &APDU) -> Response {
    if cmd.lc == 0 || cmd.data.is_empty() {
        return Response::error(SW::WRONG_LENGTH);
    }
    let fid = match cmd.data.as_slice() {
        &[hi, lo] => u16::from_be_bytes([hi, lo]),
        // paths, DF names and the like
        _ => return Response::error(SW::FUNCTION_NOT_SUPPORTED),
    };

    if fid == session.tree().root_fid() {
        session.reset_to_root();
        debug!("SELECT {:04X}: MF", fid);
        return Response::ok();
    }

    let Some(id) = session
        .find_relative(fid)
        .or_else(|| session.find_global(fid))
    else {
        debug!("SELECT {:04X}: not found", fid);
        return Response::error(SW::FILE_NOT_FOUND);
    };

    session.select_node(id);
    let tree = session.tree();
    debug!("SELECT {:04X}: {} {}", fid, tree.node(id).kind().label(), tree.path_str(id));
    Response::ok()
}

/// Handle READ BINARY (INS B0) on the current Transparent EF.
///
/// Offset is P1P2, length is Le (0 meaning 256). Reads running past the end
/// of the file return the bytes that exist.
pub fn handle_read_binary(session: &mut CardSession, cmd: &APDU) -> Response {
    let ef = match session.current_file_node().kind() {
        NodeKind::Transparent(ef) => ef,
        NodeKind::Container(_) | NodeKind::LinearFixed(_) => {
            return Response::error(SW::COMMAND_NOT_ALLOWED_NO_EF);
        }
    };
    let Some(length) = cmd.expected_length() else {
        return Response::error(SW::WRONG_LENGTH);
    };

    let offset = cmd.p1p2() as usize;
    match ef.read_binary(offset, length) {
        Ok(data) => Response::success(data.to_vec()),
        Err(e) => {
            debug!("READ BINARY rejected: {}", e);
            Response::error(SW::WRONG_P1_P2)
        }
    }
}

/// Handle READ RECORD (INS B2) on the current Linear Fixed EF.
///
/// Only absolute mode (P2 & 07 == 04) with the record number in P1.
/// Without Le the whole record is returned, otherwise at most Le bytes.
pub fn handle_read_record(session: &mut CardSession, cmd: &APDU) -> Response {
    let ef = match session.current_file_node().kind() {
        NodeKind::LinearFixed(ef) => ef,
        NodeKind::Container(_) | NodeKind::Transparent(_) => {
            return Response::error(SW::COMMAND_NOT_ALLOWED_NO_EF);
        }
    };
    if cmd.p2 & 0x07 != RECORD_MODE_ABSOLUTE {
        return Response::error(SW::FUNCTION_NOT_SUPPORTED);
    }
    if cmd.p1 == 0 {
        return Response::error(SW::WRONG_P1_P2);
    }

    let record = match ef.read_record(cmd.p1 as usize) {
        Ok(record) => record,
        Err(e) => {
            debug!("READ RECORD rejected: {}", e);
            return Response::error(SW::RECORD_NOT_FOUND);
        }
    };

    let length = cmd.expected_length().unwrap_or(record.len());
    Response::success(record[..length.min(record.len())].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::{Container, FileTree, LinearFixedEf, TransparentEf, MF_FID};
    use std::sync::Arc;

    /// MF 3F00
    /// ├── EF_ICCID 2FE2 (10 bytes)
    /// ├── DF_TELECOM 7F10
    /// │   └── EF_ADN 6F3A (3 x 4 bytes)
    /// └── ADF_USIM 7FFF
    ///     ├── EF_IMSI 6F07
    ///     └── DF_GSM 7F20
    ///         └── EF_IMSI 6F07 (deeper copy)
    fn session() -> CardSession {
        let mut tree = FileTree::new(MF_FID, "MF");
        let mf = tree.root();
        tree.add_child(mf, 0x2FE2, "EF_ICCID", TransparentEf::new((0..10).collect()))
            .unwrap();
        let telecom = tree.add_child(mf, 0x7F10, "DF_TELECOM", Container::dedicated()).unwrap();
        let records = vec![vec![1, 1, 1, 1], vec![2, 2, 2, 2], vec![3, 3, 3, 3]];
        tree.add_child(telecom, 0x6F3A, "EF_ADN", LinearFixedEf::new(4, records).unwrap())
            .unwrap();
        let usim = tree.add_child(mf, 0x7FFF, "ADF_USIM", Container::application()).unwrap();
        tree.add_child(usim, 0x6F07, "EF_IMSI", TransparentEf::new(vec![0xA1; 9]))
            .unwrap();
        let gsm = tree.add_child(usim, 0x7F20, "DF_GSM", Container::dedicated()).unwrap();
        tree.add_child(gsm, 0x6F07, "EF_IMSI_GSM", TransparentEf::new(vec![0xB2; 9]))
            .unwrap();
        CardSession::new(Arc::new(tree))
    }

    fn select(session: &mut CardSession, fid: u16) -> Response {
        let cmd = APDU::with_data(0x00, 0xA4, 0x00, 0x0C, fid.to_be_bytes().to_vec()).unwrap();
        handle_select(session, &cmd)
    }

    fn read_binary(offset: u16, le: Option<u8>) -> APDU {
        let [p1, p2] = offset.to_be_bytes();
        let mut cmd = APDU::new(0x00, 0xB0, p1, p2);
        cmd.le = le;
        cmd
    }

    fn read_record(p1: u8, p2: u8, le: Option<u8>) -> APDU {
        let mut cmd = APDU::new(0x00, 0xB2, p1, p2);
        cmd.le = le;
        cmd
    }

    #[test]
    fn test_select_without_data() {
        let mut session = session();
        let cmd = APDU::new(0x00, 0xA4, 0x00, 0x0C);
        assert_eq!(handle_select(&mut session, &cmd).sw(), SW::WRONG_LENGTH);
    }

    #[test]
    fn test_select_path_not_supported() {
        let mut session = session();
        let cmd = APDU::with_data(0x00, 0xA4, 0x08, 0x0C, vec![0x7F, 0xFF, 0x6F, 0x07]).unwrap();
        assert_eq!(handle_select(&mut session, &cmd).sw(), SW::FUNCTION_NOT_SUPPORTED);
        let cmd = APDU::with_data(0x00, 0xA4, 0x00, 0x0C, vec![0x7F]).unwrap();
        assert_eq!(handle_select(&mut session, &cmd).sw(), SW::FUNCTION_NOT_SUPPORTED);
    }

    #[test]
    fn test_select_unknown_fid() {
        let mut session = session();
        let before = session.current_file();
        assert_eq!(select(&mut session, 0x1234).sw(), SW::FILE_NOT_FOUND);
        assert_eq!(session.current_file(), before);
    }

    #[test]
    fn test_select_mf_resets_from_anywhere() {
        let mut session = session();
        assert!(select(&mut session, 0x7FFF).is_okay());
        assert!(select(&mut session, 0x6F07).is_okay());
        assert!(select(&mut session, MF_FID).is_okay());
        let root = session.tree().root();
        assert_eq!(session.current_container(), root);
        assert_eq!(session.current_file(), root);
    }

    #[test]
    fn test_select_relative_wins_over_global() {
        let mut session = session();
        // From the MF the shallow EF_IMSI under ADF_USIM is found first
        assert!(select(&mut session, 0x6F07).is_okay());
        assert_eq!(session.current_file_node().name(), "EF_IMSI");

        // Under DF_GSM the relative copy wins
        assert!(select(&mut session, 0x7F20).is_okay());
        assert!(select(&mut session, 0x6F07).is_okay());
        assert_eq!(session.current_file_node().name(), "EF_IMSI_GSM");
    }

    #[test]
    fn test_select_falls_back_to_global() {
        let mut session = session();
        assert!(select(&mut session, 0x7FFF).is_okay());
        assert!(select(&mut session, 0x6F3A).is_okay());
        assert_eq!(session.current_file_node().name(), "EF_ADN");
        // EF selection keeps the DF: ADF_USIM is still the current container
        assert_eq!(session.tree().node(session.current_container()).fid(), 0x7FFF);
    }

    #[test]
    fn test_read_binary_requires_transparent_ef() {
        let mut session = session();
        let resp = handle_read_binary(&mut session, &read_binary(0, Some(4)));
        assert_eq!(resp.sw(), SW::COMMAND_NOT_ALLOWED_NO_EF);

        select(&mut session, 0x6F3A);
        let resp = handle_read_binary(&mut session, &read_binary(0, Some(4)));
        assert_eq!(resp.sw(), SW::COMMAND_NOT_ALLOWED_NO_EF);
    }

    #[test]
    fn test_read_binary_requires_le() {
        let mut session = session();
        select(&mut session, 0x2FE2);
        let resp = handle_read_binary(&mut session, &read_binary(0, None));
        assert_eq!(resp.to_bytes(), vec![0x67, 0x00]);
    }

    #[test]
    fn test_read_binary_offset_and_truncation() {
        let mut session = session();
        select(&mut session, 0x2FE2);

        let resp = handle_read_binary(&mut session, &read_binary(2, Some(3)));
        assert_eq!(resp.to_bytes(), vec![2, 3, 4, 0x90, 0x00]);

        // Le=0 asks for 256 bytes, only 10 exist
        let resp = handle_read_binary(&mut session, &read_binary(0, Some(0)));
        assert!(resp.is_okay());
        assert_eq!(resp.data, (0..10).collect::<Vec<u8>>());

        let resp = handle_read_binary(&mut session, &read_binary(8, Some(5)));
        assert_eq!(resp.to_bytes(), vec![8, 9, 0x90, 0x00]);
    }

    #[test]
    fn test_read_binary_offset_bounds() {
        let mut session = session();
        select(&mut session, 0x2FE2);

        let resp = handle_read_binary(&mut session, &read_binary(10, Some(1)));
        assert_eq!(resp.to_bytes(), vec![0x90, 0x00]);

        let resp = handle_read_binary(&mut session, &read_binary(11, Some(1)));
        assert_eq!(resp.to_bytes(), vec![0x6B, 0x00]);
    }

    #[test]
    fn test_read_record_requires_linear_fixed_ef() {
        let mut session = session();
        select(&mut session, 0x2FE2);
        let resp = handle_read_record(&mut session, &read_record(1, 0x04, None));
        assert_eq!(resp.sw(), SW::COMMAND_NOT_ALLOWED_NO_EF);
    }

    #[test]
    fn test_read_record_absolute() {
        let mut session = session();
        select(&mut session, 0x6F3A);
        let resp = handle_read_record(&mut session, &read_record(2, 0x04, None));
        assert_eq!(resp.to_bytes(), vec![2, 2, 2, 2, 0x90, 0x00]);

        // SFI bits in P2 do not change the mode
        let resp = handle_read_record(&mut session, &read_record(3, 0x0C, Some(4)));
        assert_eq!(resp.to_bytes(), vec![3, 3, 3, 3, 0x90, 0x00]);
    }

    #[test]
    fn test_read_record_le_truncates() {
        let mut session = session();
        select(&mut session, 0x6F3A);
        let resp = handle_read_record(&mut session, &read_record(1, 0x04, Some(2)));
        assert_eq!(resp.to_bytes(), vec![1, 1, 0x90, 0x00]);

        // Le larger than the record, or 0 (256), returns the full record
        let resp = handle_read_record(&mut session, &read_record(1, 0x04, Some(0)));
        assert_eq!(resp.to_bytes(), vec![1, 1, 1, 1, 0x90, 0x00]);
        let resp = handle_read_record(&mut session, &read_record(1, 0x04, Some(200)));
        assert_eq!(resp.data.len(), 4);
    }

    #[test]
    fn test_read_record_modes_and_bounds() {
        let mut session = session();
        select(&mut session, 0x6F3A);

        let next = handle_read_record(&mut session, &read_record(0, 0x02, None));
        assert_eq!(next.sw(), SW::FUNCTION_NOT_SUPPORTED);

        let zero = handle_read_record(&mut session, &read_record(0, 0x04, None));
        assert_eq!(zero.sw(), SW::WRONG_P1_P2);

        let past = handle_read_record(&mut session, &read_record(4, 0x04, None));
        assert_eq!(past.sw(), SW::RECORD_NOT_FOUND);
    }
}
