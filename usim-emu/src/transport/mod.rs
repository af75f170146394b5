//! Line-oriented APDU transport
//!
//! One command per line, written as hex text (`00A4000C023F00`). Every
//! command gets exactly one line back: the hex of `data || SW1 SW2`.
//! This is a test harness protocol, not ISO 7816-3 framing.

pub mod tcp;

pub use tcp::TcpServer;

use std::io::{self, BufRead, Read, Write};
use std::panic::{self, AssertUnwindSafe};

use log::{error, warn};
use thiserror::Error;

use crate::apdu::SW;
use crate::card::SessionHandle;

/// Longest accepted input line. A maximal short APDU is 261 bytes, 522 hex
/// digits; the rest leaves room for spaces and CR.
pub const MAX_LINE_LEN: usize = 1024;

/// Errors that stop the transport itself (never raised per command)
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Turn one input line into one response, or None for blank lines.
///
/// Text that is not valid hex is answered with 6700. A panic inside the
/// command handlers is contained and answered with 6A81.
pub fn respond_to_line(session: &mut SessionHandle, line: &[u8]) -> Option<Vec<u8>> {
    respond_with(line, |raw| session.dispatch(raw))
}

fn respond_with<F>(line: &[u8], mut process: F) -> Option<Vec<u8>>
where
    F: FnMut(&[u8]) -> Vec<u8>,
{
    let text = String::from_utf8_lossy(line);
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    let raw = match hex::decode(&compact) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Undecodable APDU line {:?}: {}", text.trim(), e);
            return Some(SW::to_bytes(SW::WRONG_LENGTH).to_vec());
        }
    };

    match panic::catch_unwind(AssertUnwindSafe(|| process(&raw))) {
        Ok(response) => Some(response),
        Err(_) => {
            error!("Internal error while processing {}", compact);
            Some(SW::to_bytes(SW::FUNCTION_NOT_SUPPORTED).to_vec())
        }
    }
}

/// Serve one conversation until the reader hits EOF
pub fn serve_connection<R, W>(reader: R, writer: W, session: &mut SessionHandle) -> io::Result<()>
where
    R: BufRead,
    W: Write,
{
    serve_lines(reader, writer, |raw| session.dispatch(raw))
}

fn serve_lines<R, W, F>(mut reader: R, mut writer: W, mut process: F) -> io::Result<()>
where
    R: BufRead,
    W: Write,
    F: FnMut(&[u8]) -> Vec<u8>,
{
    let mut line = Vec::with_capacity(MAX_LINE_LEN + 1);
    loop {
        let response = match read_line(&mut reader, &mut line)? {
            Line::Eof => return Ok(()),
            Line::Complete => respond_with(&line, &mut process),
            Line::TooLong => {
                warn!("APDU line longer than {} bytes dropped", MAX_LINE_LEN);
                Some(SW::to_bytes(SW::WRONG_LENGTH).to_vec())
            }
        };
        if let Some(response) = response {
            writeln!(writer, "{}", hex::encode_upper(response))?;
            writer.flush()?;
        }
    }
}

enum Line {
    Complete,
    TooLong,
    Eof,
}

/// Read one `\n` terminated line into `buf`, buffering at most
/// `MAX_LINE_LEN` bytes. An overlong line is skipped up to its newline.
fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Line> {
    buf.clear();
    let read = reader
        .by_ref()
        .take(MAX_LINE_LEN as u64 + 1)
        .read_until(b'\n', buf)?;
    if read == 0 {
        return Ok(Line::Eof);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        return Ok(Line::Complete);
    }
    if buf.len() <= MAX_LINE_LEN {
        // last line without a newline
        return Ok(Line::Complete);
    }

    buf.clear();
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            break;
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                break;
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
    Ok(Line::TooLong)
}
