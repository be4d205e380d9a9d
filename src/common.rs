//! Structures common to all the checkpoint signature formats
use crate::errors::{Error, Result};
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Standard Ed25519 note signature.
pub const ALG_ED25519: u8 = 0x01;
/// Timestamped Ed25519 witness cosignature, see <https://c2sp.org/tlog-cosignature>.
pub const ALG_COSIGNATURE_V1: u8 = 0x04;
/// RFC 6962 signed tree head, as used by static CT logs.
pub const ALG_RFC6962_STH: u8 = 0x05;

/// Size of the key hash prefixed to every note signature.
pub const KEY_HASH_SIZE: usize = 4;
/// Size of the big endian Unix timestamp prefixed to timestamped signatures.
pub const TIMESTAMP_SIZE: usize = 8;

/// Prefix of a signature line.
pub const SIG_PREFIX: &str = "\u{2014} ";

/// Compute the note key hash: the first four bytes of
/// `SHA-256(name || "\n" || key)`, read big endian. `key` already carries the
/// algorithm tag.
pub fn key_hash(name: &str, key: &[u8]) -> u32 {
    let digest = Sha256::new()
        .chain_update(name.as_bytes())
        .chain_update(b"\n")
        .chain_update(key)
        .finalize();
    let mut prefix = [0u8; KEY_HASH_SIZE];
    prefix.copy_from_slice(&digest[..KEY_HASH_SIZE]);
    u32::from_be_bytes(prefix)
}

/// A name is valid if it is non-empty and contains neither whitespace nor `+`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(|c: char| c.is_whitespace() || c == '+')
}

/// Parse the 8 hex digit key hash field of a key string.
fn parse_key_hash(hash16: &str) -> Option<u32> {
    if hash16.len() != 2 * KEY_HASH_SIZE {
        return None;
    }
    let mut bytes = [0u8; KEY_HASH_SIZE];
    hex::decode_to_slice(hash16, &mut bytes).ok()?;
    Some(u32::from_be_bytes(bytes))
}

/// The fields of a `name+hash+base64key` verifier string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierKey {
    /// Name of the key.
    pub name: String,
    /// Key hash as written in the string.
    pub declared_hash: u32,
    /// Algorithm tag, the first byte of the decoded key.
    pub alg: u8,
    /// Key material following the algorithm tag.
    pub key: Vec<u8>,
}

impl VerifierKey {
    /// Split and decode a verifier string.
    ///
    /// # Errors
    /// The function fails if
    /// * the string does not have three `+` separated fields
    /// * the name is invalid or the hash is not 8 hex digits
    /// * the key is not base64 or decodes to nothing
    pub fn parse(vkey: &str) -> Result<Self> {
        let (name, rest) = vkey.split_once('+').ok_or(Error::MalformedVerifierKey)?;
        let (hash16, key64) = rest.split_once('+').ok_or(Error::MalformedVerifierKey)?;
        if !is_valid_name(name) {
            return Err(Error::MalformedVerifierKey);
        }
        let declared_hash = parse_key_hash(hash16).ok_or(Error::MalformedVerifierKey)?;
        let raw = B64
            .decode(key64)
            .map_err(|_| Error::MalformedVerifierKey)?;
        let (&alg, key) = raw.split_first().ok_or(Error::MalformedVerifierKey)?;

        Ok(Self {
            name: name.to_owned(),
            declared_hash,
            alg,
            key: key.to_vec(),
        })
    }

    /// Check the declared hash against the hash of the name and the tagged key.
    pub fn check_hash(&self) -> Result<u32> {
        let computed = key_hash(&self.name, &tagged(self.alg, &self.key));
        if computed != self.declared_hash {
            return Err(Error::KeyHashMismatch {
                declared: self.declared_hash,
                computed,
            });
        }
        Ok(computed)
    }
}

/// The fields of a `PRIVATE+KEY+name+hash+base64key` signer string. The key
/// material is wiped on drop.
pub struct SignerKey {
    /// Name of the key.
    pub name: String,
    /// Key hash as written in the string.
    pub declared_hash: u32,
    /// Algorithm tag, the first byte of the decoded key.
    pub alg: u8,
    /// Secret key material following the algorithm tag.
    pub key: Zeroizing<Vec<u8>>,
}

impl SignerKey {
    /// Split and decode a signer string.
    pub fn parse(skey: &str) -> Result<Self> {
        let rest = skey
            .strip_prefix("PRIVATE+KEY+")
            .ok_or(Error::MalformedSignerKey)?;
        let (name, rest) = rest.split_once('+').ok_or(Error::MalformedSignerKey)?;
        let (hash16, key64) = rest.split_once('+').ok_or(Error::MalformedSignerKey)?;
        if !is_valid_name(name) {
            return Err(Error::MalformedSignerKey);
        }
        let declared_hash = parse_key_hash(hash16).ok_or(Error::MalformedSignerKey)?;
        let raw = Zeroizing::new(B64.decode(key64).map_err(|_| Error::MalformedSignerKey)?);
        let (&alg, key) = raw.split_first().ok_or(Error::MalformedSignerKey)?;

        Ok(Self {
            name: name.to_owned(),
            declared_hash,
            alg,
            key: Zeroizing::new(key.to_vec()),
        })
    }
}

/// Prepend the algorithm tag to the key material.
pub(crate) fn tagged(alg: u8, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + key.len());
    out.push(alg);
    out.extend_from_slice(key);
    out
}

/// Format a verifier string from its parts.
pub(crate) fn format_verifier_key(name: &str, hash: u32, alg: u8, key: &[u8]) -> String {
    format!("{}+{:08x}+{}", name, hash, B64.encode(tagged(alg, key)))
}
