//! RFC 6962 signed tree heads as note signatures, as served by static CT logs.
//!
//! A CT log signs a TLS encoded `TreeHeadSignature` structure rather than the
//! checkpoint text. The note signature carries the STH timestamp followed by
//! the TLS `DigitallySigned` structure, and verification rebuilds the signed
//! structure from the checkpoint body. See
//! <https://c2sp.org/static-ct-api#checkpoints>.
use crate::common::{
    format_verifier_key, is_valid_name, key_hash, tagged, VerifierKey, ALG_RFC6962_STH,
    SIG_PREFIX, TIMESTAMP_SIZE,
};
use crate::errors::{Error, Result};
use crate::traits::Verifier;
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use p256::pkcs8::spki::SubjectPublicKeyInfoRef;
use p256::pkcs8::{DecodePublicKey as _, EncodePublicKey as _};
use rsa::pkcs1v15;
use rsa::signature::hazmat::PrehashVerifier as _;
use rsa::signature::Verifier as _;
use rsa::RsaPublicKey;
use serde::Deserialize;
use serde_with::{base64::Base64, serde_as};
use sha2::{Digest, Sha256};
use tracing::debug;

/// SHA-256, RFC 5246 section 7.4.1.4.1.
const HASH_SHA256: u8 = 0x04;
/// RSA signature algorithm, RFC 5246 section 7.4.1.4.1.
const SIG_RSA: u8 = 0x01;
/// ECDSA signature algorithm, RFC 5246 section 7.4.1.4.1.
const SIG_ECDSA: u8 = 0x03;

/// `Version.v1`, RFC 6962 section 3.2.
const STH_VERSION_V1: u8 = 0;
/// `SignatureType.tree_hash`, RFC 6962 section 3.2.
const SIGNATURE_TYPE_TREE_HASH: u8 = 1;

/// Public key of a CT log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogPublicKey {
    /// ECDSA key on P-256.
    EcdsaP256(p256::ecdsa::VerifyingKey),
    /// ECDSA key on P-384.
    EcdsaP384(p384::ecdsa::VerifyingKey),
    /// RSA key, signing with PKCS#1 v1.5.
    Rsa(RsaPublicKey),
}

impl LogPublicKey {
    /// Decode a DER `SubjectPublicKeyInfo`.
    ///
    /// # Errors
    /// The function fails if `der` is not a public key, or is a key of a type
    /// other than ECDSA on P-256 or P-384, or RSA.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        if let Ok(key) = p256::ecdsa::VerifyingKey::from_public_key_der(der) {
            return Ok(Self::EcdsaP256(key));
        }
        if let Ok(key) = p384::ecdsa::VerifyingKey::from_public_key_der(der) {
            return Ok(Self::EcdsaP384(key));
        }
        if let Ok(key) = RsaPublicKey::from_public_key_der(der) {
            return Ok(Self::Rsa(key));
        }
        match SubjectPublicKeyInfoRef::try_from(der) {
            Ok(_) => Err(Error::UnsupportedKeyType),
            Err(e) => Err(Error::InvalidKey(e.to_string())),
        }
    }

    /// Encode the key as a DER `SubjectPublicKeyInfo`.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let doc = match self {
            Self::EcdsaP256(key) => key.to_public_key_der(),
            Self::EcdsaP384(key) => key.to_public_key_der(),
            Self::Rsa(key) => key.to_public_key_der(),
        }
        .map_err(|e| Error::InvalidKey(e.to_string()))?;
        Ok(doc.as_bytes().to_vec())
    }

    /// The TLS hash algorithm is always SHA-256, whatever the curve.
    fn verify(&self, sig_alg: u8, msg: &[u8], sig: &[u8]) -> bool {
        match self {
            Self::EcdsaP256(key) => {
                sig_alg == SIG_ECDSA
                    && p256::ecdsa::Signature::from_der(sig)
                        .map(|sig| key.verify_prehash(&Sha256::digest(msg), &sig).is_ok())
                        .unwrap_or(false)
            }
            Self::EcdsaP384(key) => {
                sig_alg == SIG_ECDSA
                    && p384::ecdsa::Signature::from_der(sig)
                        .map(|sig| key.verify_prehash(&Sha256::digest(msg), &sig).is_ok())
                        .unwrap_or(false)
            }
            Self::Rsa(key) => {
                sig_alg == SIG_RSA
                    && pkcs1v15::Signature::try_from(sig)
                        .map(|sig| {
                            pkcs1v15::VerifyingKey::<Sha256>::new(key.clone())
                                .verify(msg, &sig)
                                .is_ok()
                        })
                        .unwrap_or(false)
            }
        }
    }
}

/// Derive the checkpoint origin of a CT log from its submission URL: lower
/// case, without scheme and trailing slash.
fn log_name(log_url: &str) -> String {
    let url = log_url.to_lowercase();
    let url = url.strip_prefix("http://").unwrap_or(&url);
    let url = url.strip_prefix("https://").unwrap_or(url);
    url.strip_suffix('/').unwrap_or(url).to_owned()
}

/// The key hash of a CT log key: the note key hash over the algorithm tag and
/// the RFC 6962 log ID, the SHA-256 of the DER key.
fn rfc6962_key_hash(name: &str, der: &[u8]) -> u32 {
    let log_id = Sha256::digest(der);
    key_hash(name, &tagged(ALG_RFC6962_STH, &log_id))
}

/// Create the verifier string for a CT log from its submission URL and key.
///
/// # Errors
/// The function fails if the derived log name is not a valid key name, or if
/// the key cannot be encoded.
pub fn rfc6962_verifier_string(log_url: &str, key: &LogPublicKey) -> Result<String> {
    let name = log_name(log_url);
    if !is_valid_name(&name) {
        return Err(Error::InvalidName(name));
    }
    let der = key.to_der()?;
    Ok(format_verifier_key(
        &name,
        rfc6962_key_hash(&name, &der),
        ALG_RFC6962_STH,
        &der,
    ))
}

/// Verifier of RFC 6962 STH signatures on checkpoints.
#[derive(Debug, Clone)]
pub struct Rfc6962Verifier {
    name: String,
    key_hash: u32,
    key: LogPublicKey,
}

impl Rfc6962Verifier {
    /// Construct a verifier from a string created by [`rfc6962_verifier_string`].
    ///
    /// The key hash is recomputed from the name and key.
    ///
    /// # Errors
    /// The function fails if the string is malformed, its algorithm is not
    /// RFC 6962, or the key is not a supported ECDSA or RSA key.
    pub fn new(vkey: &str) -> Result<Self> {
        let vkey = VerifierKey::parse(vkey)?;
        if vkey.alg != ALG_RFC6962_STH {
            return Err(Error::UnknownAlgorithm(vkey.alg));
        }
        let key = LogPublicKey::from_der(&vkey.key)?;

        Ok(Self {
            key_hash: rfc6962_key_hash(&vkey.name, &vkey.key),
            name: vkey.name,
            key,
        })
    }
}

impl Verifier for Rfc6962Verifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn key_hash(&self) -> u32 {
        self.key_hash
    }

    fn verify(&self, msg: &[u8], sig: &[u8]) -> bool {
        let Some(signed) = DigitallySigned::parse(sig) else {
            return false;
        };
        if signed.hash_alg != HASH_SHA256 {
            return false;
        }
        match tree_head_signature_input(&self.name, signed.timestamp, msg) {
            Ok(input) => self.key.verify(signed.sig_alg, &input, signed.signature),
            Err(reason) => {
                debug!(log = %self.name, reason, "rejecting checkpoint body");
                false
            }
        }
    }
}

/// A note signature split into the STH timestamp and the TLS
/// `DigitallySigned` fields.
struct DigitallySigned<'a> {
    timestamp: u64,
    hash_alg: u8,
    sig_alg: u8,
    signature: &'a [u8],
}

impl<'a> DigitallySigned<'a> {
    fn parse(sig: &'a [u8]) -> Option<Self> {
        if sig.len() < TIMESTAMP_SIZE + 4 {
            return None;
        }
        let (timestamp, rest) = sig.split_at(TIMESTAMP_SIZE);
        let mut t = [0u8; TIMESTAMP_SIZE];
        t.copy_from_slice(timestamp);
        let len = u16::from_be_bytes([rest[2], rest[3]]) as usize;
        let signature = &rest[4..];
        if signature.len() != len {
            return None;
        }
        Some(Self {
            timestamp: u64::from_be_bytes(t),
            hash_alg: rest[0],
            sig_alg: rest[1],
            signature,
        })
    }
}

/// Rebuild the TLS encoded `TreeHeadSignature` signed by the log from the
/// checkpoint body and the STH timestamp.
///
/// The body must hold exactly the origin, the tree size and the root hash;
/// extension lines cannot be expressed in an STH.
fn tree_head_signature_input(
    origin: &str,
    timestamp: u64,
    msg: &[u8],
) -> std::result::Result<Vec<u8>, &'static str> {
    let text = std::str::from_utf8(msg).map_err(|_| "body is not utf-8")?;
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() != 4 {
        return Err("wrong number of lines");
    }
    if !lines[3].is_empty() {
        return Err("extension line(s) present");
    }
    if lines[0] != origin {
        return Err("origin mismatch");
    }
    if lines[1].is_empty() || !lines[1].bytes().all(|b| b.is_ascii_digit()) {
        return Err("invalid tree size");
    }
    let size: u64 = lines[1].parse().map_err(|_| "invalid tree size")?;
    let root = B64.decode(lines[2]).map_err(|_| "invalid root hash")?;
    if root.len() != 32 {
        return Err("invalid root hash size");
    }

    let mut input = Vec::with_capacity(2 + 8 + 8 + 32);
    input.push(STH_VERSION_V1);
    input.push(SIGNATURE_TYPE_TREE_HASH);
    input.extend_from_slice(&timestamp.to_be_bytes());
    input.extend_from_slice(&size.to_be_bytes());
    input.extend_from_slice(&root);
    Ok(input)
}

/// The JSON response of the RFC 6962 `get-sth` method, section 4.3.
#[serde_as]
#[derive(Debug, Deserialize)]
struct SignedTreeHead {
    tree_size: u64,
    timestamp: u64,
    #[serde_as(as = "Base64")]
    sha256_root_hash: Vec<u8>,
    #[serde_as(as = "Base64")]
    tree_head_signature: Vec<u8>,
}

/// Convert the JSON of an RFC 6962 signed tree head into a signed checkpoint.
///
/// `verifier` must be the [`Rfc6962Verifier`] of the log which signed the
/// STH; its name becomes the checkpoint origin.
///
/// # Errors
/// The function fails if `json` is not a signed tree head.
pub fn rfc6962_sth_to_checkpoint(json: &[u8], verifier: &dyn Verifier) -> Result<Vec<u8>> {
    let sth: SignedTreeHead = serde_json::from_slice(json)?;
    let name = verifier.name();

    let mut sig = verifier.key_hash().to_be_bytes().to_vec();
    sig.extend_from_slice(&sth.timestamp.to_be_bytes());
    sig.extend_from_slice(&sth.tree_head_signature);

    let checkpoint = format!(
        "{}\n{}\n{}\n\n{}{} {}\n",
        name,
        sth.tree_size,
        B64.encode(&sth.sha256_root_hash),
        SIG_PREFIX,
        name,
        B64.encode(sig)
    );
    Ok(checkpoint.into_bytes())
}
