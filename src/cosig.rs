//! Timestamped witness cosignatures, see <https://c2sp.org/tlog-cosignature>.
//!
//! A cosignature/v1 signature is `timestamp || ed25519 signature`, where the
//! timestamp is the big endian Unix time in seconds at which the witness
//! signed, and the ed25519 signature covers
//!
//! ```text
//! cosignature/v1
//! time <timestamp>
//! <checkpoint body>
//! ```
//!
//! Witness keys are published in the standard ed25519 note format. The
//! cosignature key hash is computed with the cosignature algorithm tag, so it
//! differs from the hash in the published key string.
use crate::common::{
    format_verifier_key, key_hash, tagged, SignerKey, VerifierKey, ALG_COSIGNATURE_V1, ALG_ED25519,
    KEY_HASH_SIZE, TIMESTAMP_SIZE,
};
use crate::ed25519::{signing_key, verify_ed25519, verifying_key};
use crate::errors::{Error, Result};
use crate::note::Signature;
use crate::traits::{Signer, Verifier};
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey, SIGNATURE_LENGTH};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Size of a cosignature/v1 signature payload.
pub const COSIGNATURE_V1_SIZE: usize = TIMESTAMP_SIZE + SIGNATURE_LENGTH;

/// Build the message signed by a cosignature/v1 signature made at `timestamp`.
///
/// # Errors
/// The function fails if `body` has fewer than three lines.
fn cosigned_message(timestamp: u64, body: &[u8]) -> Result<Vec<u8>> {
    if body.split(|&b| b == b'\n').count() < 3 {
        return Err(Error::CosignedNoteFormat);
    }
    let mut msg = format!("cosignature/v1\ntime {}\n", timestamp).into_bytes();
    msg.extend_from_slice(body);
    Ok(msg)
}

/// Verifier of cosignature/v1 signatures.
#[derive(Debug, Clone)]
pub struct CosignatureV1Verifier {
    name: String,
    key_hash: u32,
    key: VerifyingKey,
}

impl CosignatureV1Verifier {
    /// Construct a verifier from a witness key string.
    ///
    /// The key may be a standard ed25519 note key, as witnesses publish them,
    /// or a key already tagged with the cosignature algorithm.
    ///
    /// # Errors
    /// The function fails if
    /// * the string does not split into `name+hash+base64key`
    /// * the base64 or the key hash field is malformed
    /// * the algorithm tag is neither ed25519 nor cosignature/v1
    /// * the declared key hash does not match the name and key
    pub fn new(vkey: &str) -> Result<Self> {
        let vkey = VerifierKey::parse(vkey)?;
        if vkey.alg != ALG_ED25519 && vkey.alg != ALG_COSIGNATURE_V1 {
            return Err(Error::UnknownAlgorithm(vkey.alg));
        }
        let key = verifying_key(&vkey.key)?;
        vkey.check_hash()?;

        Ok(Self {
            key_hash: key_hash(&vkey.name, &tagged(ALG_COSIGNATURE_V1, key.as_bytes())),
            name: vkey.name,
            key,
        })
    }

    /// The verifier string of this key under the cosignature algorithm tag.
    pub fn verifier_key(&self) -> String {
        format_verifier_key(
            &self.name,
            self.key_hash,
            ALG_COSIGNATURE_V1,
            self.key.as_bytes(),
        )
    }
}

impl Verifier for CosignatureV1Verifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn key_hash(&self) -> u32 {
        self.key_hash
    }

    fn verify(&self, msg: &[u8], sig: &[u8]) -> bool {
        if sig.len() != COSIGNATURE_V1_SIZE {
            return false;
        }
        let (timestamp, sig) = sig.split_at(TIMESTAMP_SIZE);
        let mut t = [0u8; TIMESTAMP_SIZE];
        t.copy_from_slice(timestamp);
        match cosigned_message(u64::from_be_bytes(t), msg) {
            Ok(m) => verify_ed25519(&self.key, &m, sig),
            Err(_) => false,
        }
    }
}

/// Signer producing cosignature/v1 signatures.
#[derive(Debug)]
pub struct CosignatureV1Signer {
    name: String,
    key_hash: u32,
    key: SigningKey,
}

impl CosignatureV1Signer {
    /// Construct a signer from a standard ed25519 note signer key.
    ///
    /// # Errors
    /// The function fails if the string is malformed, is not an ed25519 key,
    /// or its key hash does not match.
    pub fn new(skey: &str) -> Result<Self> {
        let skey = SignerKey::parse(skey)?;
        if skey.alg != ALG_ED25519 {
            return Err(Error::UnknownAlgorithm(skey.alg));
        }
        let key = signing_key(&skey.key)?;
        let public = key.verifying_key();
        let computed = key_hash(&skey.name, &tagged(ALG_ED25519, public.as_bytes()));
        if computed != skey.declared_hash {
            return Err(Error::KeyHashMismatch {
                declared: skey.declared_hash,
                computed,
            });
        }

        Ok(Self {
            key_hash: key_hash(&skey.name, &tagged(ALG_COSIGNATURE_V1, public.as_bytes())),
            name: skey.name,
            key,
        })
    }

    /// Sign `msg` as if at `timestamp`, in Unix seconds.
    pub fn sign_at(&self, timestamp: u64, msg: &[u8]) -> Result<Vec<u8>> {
        let m = cosigned_message(timestamp, msg)?;
        let mut sig = Vec::with_capacity(COSIGNATURE_V1_SIZE);
        sig.extend_from_slice(&timestamp.to_be_bytes());
        sig.extend_from_slice(&self.key.sign(&m).to_bytes());
        Ok(sig)
    }
}

impl Signer for CosignatureV1Signer {
    fn name(&self) -> &str {
        &self.name
    }

    fn key_hash(&self) -> u32 {
        self.key_hash
    }

    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Signing(e.to_string()))?;
        self.sign_at(now.as_secs(), msg)
    }

    fn verifier(&self) -> Arc<dyn Verifier> {
        Arc::new(CosignatureV1Verifier {
            name: self.name.clone(),
            key_hash: self.key_hash,
            key: self.key.verifying_key(),
        })
    }
}

/// Extract the time at which a cosignature/v1 signature was made, without
/// verifying it.
///
/// # Errors
/// The function fails if the signature is not base64, or does not have the
/// length of a key hash followed by a cosignature/v1 payload.
pub fn cosignature_v1_timestamp(sig: &Signature) -> Result<SystemTime> {
    let raw = B64
        .decode(&sig.base64)
        .map_err(|_| Error::MalformedSignature)?;
    if raw.len() != KEY_HASH_SIZE + COSIGNATURE_V1_SIZE {
        return Err(Error::NotCosignatureV1(raw.len()));
    }
    let mut t = [0u8; TIMESTAMP_SIZE];
    t.copy_from_slice(&raw[KEY_HASH_SIZE..KEY_HASH_SIZE + TIMESTAMP_SIZE]);
    Ok(UNIX_EPOCH + Duration::from_secs(u64::from_be_bytes(t)))
}
