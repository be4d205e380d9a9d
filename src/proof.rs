//! Inclusion proof bundles in the `c2sp.org/tlog-proof@v1` text format.
//!
//! ```text
//! c2sp.org/tlog-proof@v1
//! extra <base64 application data>      (optional)
//! index <decimal entry index>
//! <base64 hash>                         (zero or more)
//!
//! <signed checkpoint>
//! ```
use crate::errors::{Error, Result};
use base64::{engine::general_purpose::STANDARD as B64, Engine};

#[cfg(feature = "serde_enabled")]
use serde::{Deserialize, Serialize};

const TLOG_PROOF_HEADER_V1: &str = "c2sp.org/tlog-proof@v1";

/// Maximum size of a line, newline included.
const MAX_LINE_SIZE: usize = 64 * 1024;

/// Size of a Merkle tree hash.
pub const HASH_SIZE: usize = 32;

/// A transparency log inclusion proof, see <https://c2sp.org/tlog-proof>.
///
/// With `serde_enabled`, byte fields are serialized as base64 strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
pub struct TLogProof {
    /// Index of the entry in the log.
    pub index: u64,
    /// Merkle inclusion proof, RFC 6962 section 2.1.1.
    #[cfg_attr(
        feature = "serde_enabled",
        serde(with = "serde_with::As::<Vec<serde_with::base64::Base64>>")
    )]
    pub hashes: Vec<[u8; HASH_SIZE]>,
    /// Signed checkpoint the proof is relative to.
    #[cfg_attr(
        feature = "serde_enabled",
        serde(with = "serde_with::As::<serde_with::base64::Base64>")
    )]
    pub checkpoint: Vec<u8>,
    /// Optional application data. `Some` of an empty vector is written as an
    /// empty `extra` line, `None` omits the line.
    #[cfg_attr(
        feature = "serde_enabled",
        serde(
            default,
            with = "serde_with::As::<Option<serde_with::base64::Base64>>"
        )
    )]
    pub extra_data: Option<Vec<u8>>,
}

impl TLogProof {
    /// Encode the proof in its text format.
    pub fn marshal(&self) -> Vec<u8> {
        let mut out = format!("{}\n", TLOG_PROOF_HEADER_V1);
        if let Some(extra) = &self.extra_data {
            out.push_str(&format!("extra {}\n", B64.encode(extra)));
        }
        out.push_str(&format!("index {}\n", self.index));
        for hash in &self.hashes {
            out.push_str(&B64.encode(hash));
            out.push('\n');
        }
        out.push('\n');

        let mut out = out.into_bytes();
        out.extend_from_slice(&self.checkpoint);
        out
    }

    /// Decode a proof from its text format.
    ///
    /// Every line of the checkpoint is returned terminated by a newline, and
    /// carriage returns ending a line are dropped.
    ///
    /// # Errors
    /// The function fails if the header, the `extra` line, the `index` line or
    /// a hash line is malformed, or if a line exceeds 64 KiB.
    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        let mut lines = LineScanner::new(data);

        if lines.next_line() != Some(TLOG_PROOF_HEADER_V1.as_bytes()) {
            return Err(Error::ProofHeader);
        }

        let mut line = lines.next_line().unwrap_or_default();
        let mut extra_data = None;
        if let Some(extra) = line.strip_prefix(b"extra ") {
            extra_data = Some(B64.decode(extra).map_err(Error::ProofExtraData)?);
            line = lines.next_line().unwrap_or_default();
        }

        let index = line.strip_prefix(b"index ").ok_or(Error::ProofMissingIndex)?;
        let index = parse_index(index)?;

        let mut hashes = Vec::new();
        while let Some(line) = lines.next_line() {
            if line.is_empty() {
                break;
            }
            let hash = B64.decode(line).map_err(Error::ProofHashEncoding)?;
            let hash: [u8; HASH_SIZE] = hash
                .try_into()
                .map_err(|h: Vec<u8>| Error::ProofHashLength(h.len()))?;
            hashes.push(hash);
        }

        let mut checkpoint = Vec::new();
        while let Some(line) = lines.next_line() {
            checkpoint.extend_from_slice(line);
            checkpoint.push(b'\n');
        }

        if lines.failed {
            return Err(Error::ProofScan(MAX_LINE_SIZE));
        }

        Ok(Self {
            index,
            hashes,
            checkpoint,
            extra_data,
        })
    }
}

/// Parse a decimal `u64` with no sign and no surrounding space.
fn parse_index(index: &[u8]) -> Result<u64> {
    let invalid = || Error::ProofIndex(String::from_utf8_lossy(index).into_owned());
    if index.is_empty() || !index.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    std::str::from_utf8(index)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(invalid)
}

/// Splits input into lines terminated by `\n` or by the end of input.
///
/// A line too long stops the scan: `next_line` returns `None` from then on
/// and `failed` is set, so that a reader stops at the oversized line and
/// reports the failure once it is done.
struct LineScanner<'a> {
    rest: &'a [u8],
    failed: bool,
}

impl<'a> LineScanner<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            rest: data,
            failed: false,
        }
    }

    fn next_line(&mut self) -> Option<&'a [u8]> {
        if self.failed || self.rest.is_empty() {
            return None;
        }
        let (line, size) = match self.rest.iter().position(|&b| b == b'\n') {
            Some(end) => (&self.rest[..end], end + 1),
            None => (self.rest, self.rest.len()),
        };
        if size > MAX_LINE_SIZE {
            self.failed = true;
            return None;
        }
        self.rest = &self.rest[size..];
        Some(line.strip_suffix(b"\r").unwrap_or(line))
    }
}
