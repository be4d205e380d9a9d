//! Signed notes: a text body followed by a blank line and one signature line
//! per signer, see <https://c2sp.org/signed-note>.
//!
//! This is the envelope every checkpoint travels in. Each signature line reads
//! `— <name> <base64(keyhash || signature)>`, so a reader can pick the lines
//! belonging to the verifiers it knows by name and key hash alone.
use crate::common::{is_valid_name, KEY_HASH_SIZE, SIG_PREFIX};
use crate::errors::{Error, Result};
use crate::traits::{Signer, Verifier};
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use std::collections::HashSet;

/// Maximum number of signature lines accepted on a note.
const MAX_SIGNATURES: usize = 100;

/// A signature line of a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Name of the signing key.
    pub name: String,
    /// Key hash of the signing key.
    pub hash: u32,
    /// Base64 of `keyhash || signature`, as found on the line.
    pub base64: String,
}

/// A note whose signatures have been checked against a set of verifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    /// Body of the note, ending in a newline.
    pub text: String,
    /// Signatures verified by one of the known verifiers.
    pub sigs: Vec<Signature>,
    /// Signatures from keys not among the known verifiers.
    pub unverified_sigs: Vec<Signature>,
}

/// A signature line split into its fields but not yet verified.
#[derive(Debug)]
pub(crate) struct SignatureLine<'a> {
    line: &'a str,
    name: &'a str,
    hash: u32,
    base64: &'a str,
    sig: Vec<u8>,
}

impl SignatureLine<'_> {
    fn to_signature(&self) -> Signature {
        Signature {
            name: self.name.to_owned(),
            hash: self.hash,
            base64: self.base64.to_owned(),
        }
    }
}

/// A note split into body and signature lines. Parsing is done once, so that
/// many verifiers can be checked against the same note.
#[derive(Debug)]
pub(crate) struct SignedNote<'a> {
    text: &'a str,
    lines: Vec<SignatureLine<'a>>,
}

impl<'a> SignedNote<'a> {
    /// Split `msg` into body and signature lines.
    pub(crate) fn parse(msg: &'a [u8]) -> Result<Self> {
        let msg = std::str::from_utf8(msg).map_err(|_| Error::MalformedNote)?;
        if msg.chars().any(|c| c < '\u{20}' && c != '\n') {
            return Err(Error::MalformedNote);
        }

        let split = msg.rfind("\n\n").ok_or(Error::MalformedNote)?;
        let (text, sigs) = (&msg[..split + 1], &msg[split + 2..]);
        if !sigs.ends_with('\n') {
            return Err(Error::MalformedNote);
        }

        let mut lines = Vec::new();
        for line in sigs[..sigs.len() - 1].split('\n') {
            if lines.len() == MAX_SIGNATURES {
                return Err(Error::MalformedNote);
            }
            let body = line.strip_prefix(SIG_PREFIX).ok_or(Error::MalformedNote)?;
            let (name, base64) = body.split_once(' ').ok_or(Error::MalformedNote)?;
            if !is_valid_name(name) || base64.is_empty() {
                return Err(Error::MalformedNote);
            }
            let raw = B64.decode(base64).map_err(|_| Error::MalformedNote)?;
            if raw.len() <= KEY_HASH_SIZE {
                return Err(Error::MalformedNote);
            }
            let mut hash = [0u8; KEY_HASH_SIZE];
            hash.copy_from_slice(&raw[..KEY_HASH_SIZE]);
            lines.push(SignatureLine {
                line,
                name,
                hash: u32::from_be_bytes(hash),
                base64,
                sig: raw[KEY_HASH_SIZE..].to_vec(),
            });
        }

        Ok(Self { text, lines })
    }

    /// The first signature line naming the key of `verifier`, if any.
    fn line_for(&self, verifier: &dyn Verifier) -> Option<&SignatureLine<'a>> {
        self.lines
            .iter()
            .find(|l| l.name == verifier.name() && l.hash == verifier.key_hash())
    }

    /// Whether the note carries a valid signature from `verifier`.
    ///
    /// Only the first line matching the verifier's name and key hash counts,
    /// so a valid signature repeated after an invalid one does not help.
    pub(crate) fn verified_by(&self, verifier: &dyn Verifier) -> bool {
        match self.line_for(verifier) {
            Some(line) => verifier.verify(self.text.as_bytes(), &line.sig),
            None => false,
        }
    }
}

/// Open a signed note, checking its signatures against `known`.
///
/// # Errors
/// The function fails if
/// * `msg` is not a well formed signed note
/// * a signature from a known verifier does not verify
/// * no signature from a known verifier is present
pub fn open(msg: &[u8], known: &[&dyn Verifier]) -> Result<Note> {
    let signed = SignedNote::parse(msg)?;

    let mut sigs = Vec::new();
    for verifier in known {
        let Some(line) = signed.line_for(*verifier) else {
            continue;
        };
        if sigs.iter().any(|s: &Signature| s.name == line.name && s.hash == line.hash) {
            continue;
        }
        if !verifier.verify(signed.text.as_bytes(), &line.sig) {
            return Err(Error::InvalidSignature {
                name: line.name.to_owned(),
                hash: line.hash,
            });
        }
        sigs.push(line.to_signature());
    }
    if sigs.is_empty() {
        return Err(Error::UnverifiedNote);
    }

    let mut seen = HashSet::new();
    let unverified_sigs = signed
        .lines
        .iter()
        .filter(|l| {
            !known
                .iter()
                .any(|v| l.name == v.name() && l.hash == v.key_hash())
        })
        .filter(|l| seen.insert(l.line))
        .map(SignatureLine::to_signature)
        .collect();

    Ok(Note {
        text: signed.text.to_owned(),
        sigs,
        unverified_sigs,
    })
}

/// Sign `text` with every signer, returning the signed note.
///
/// # Errors
/// The function fails if `text` does not end in a newline or contains control
/// characters, if a signer has an invalid name, or if a signer fails.
pub fn sign(text: &str, signers: &[&dyn Signer]) -> Result<Vec<u8>> {
    if !text.ends_with('\n') || text.chars().any(|c| c < '\u{20}' && c != '\n') {
        return Err(Error::MalformedNote);
    }

    let mut out = String::from(text);
    out.push('\n');
    for signer in signers {
        if !is_valid_name(signer.name()) {
            return Err(Error::InvalidName(signer.name().to_owned()));
        }
        let mut payload = signer.key_hash().to_be_bytes().to_vec();
        payload.extend(signer.sign(text.as_bytes())?);
        out.push_str(SIG_PREFIX);
        out.push_str(signer.name());
        out.push(' ');
        out.push_str(&B64.encode(payload));
        out.push('\n');
    }

    Ok(out.into_bytes())
}
