//! USIM file system emulator
//!
//! Emulates the command interpreter of an ISO 7816-4 style card: raw command
//! APDUs are decoded, routed by instruction to SELECT FILE, READ BINARY or
//! READ RECORD, and answered with data plus a status word.
//!
//! - [`apdu`]: command codec, status words, responses
//! - [`filesystem`]: MF/DF/EF tree and the JSON profile loader
//! - [`card`]: selection state, handlers and the dispatcher
//! - [`transport`]: hex-per-line TCP front end
//!
//! ```
//! use std::sync::Arc;
//! use usim_emu::card::{dispatch, CardSession};
//! use usim_emu::filesystem::{FileTree, TransparentEf, MF_FID};
//!
//! let mut tree = FileTree::new(MF_FID, "MF");
//! let mf = tree.root();
//! tree.add_child(mf, 0x2FE2, "EF_ICCID", TransparentEf::new(vec![0x98, 0x10])).unwrap();
//!
//! let mut session = CardSession::new(Arc::new(tree));
//! assert_eq!(dispatch(&mut session, &[0x00, 0xA4, 0x00, 0x0C, 0x02, 0x2F, 0xE2]), [0x90, 0x00]);
//! assert_eq!(dispatch(&mut session, &[0x00, 0xB0, 0x00, 0x00, 0x02]), [0x98, 0x10, 0x90, 0x00]);
//! ```

pub mod apdu;
pub mod card;
pub mod config;
pub mod filesystem;
pub mod transport;

pub use apdu::{parse_apdu, APDUError, Response, APDU, SW};
pub use card::{dispatch, CardSession, SessionHandle, VirtualCard};
pub use config::{Config, SessionPolicy};
pub use filesystem::{load_profile, FileTree, FsError, ProfileError};
pub use transport::{TcpServer, TransportError};
