//! Implementation of the standard note signature, a plain ed25519 signature over
//! the note text. This is the key format witnesses and logs publish, from which
//! the timestamped variants are derived.
use crate::common::{
    format_verifier_key, is_valid_name, key_hash, tagged, SignerKey, VerifierKey, ALG_COSIGNATURE_V1,
    ALG_ED25519, ALG_RFC6962_STH,
};
use crate::cosig::CosignatureV1Verifier;
use crate::errors::{Error, Result};
use crate::rfc6962::Rfc6962Verifier;
use crate::traits::{Signer, Verifier};
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use ed25519_dalek::{
    Signature as EdSignature, Signer as _, SigningKey, VerifyingKey, PUBLIC_KEY_LENGTH,
    SECRET_KEY_LENGTH,
};
use rand_core::CryptoRngCore;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Decode a raw ed25519 public key.
pub(crate) fn verifying_key(bytes: &[u8]) -> Result<VerifyingKey> {
    let bytes: &[u8; PUBLIC_KEY_LENGTH] =
        bytes.try_into().map_err(|_| Error::MalformedVerifierKey)?;
    VerifyingKey::from_bytes(bytes).map_err(|e| Error::InvalidKey(e.to_string()))
}

/// Decode a raw ed25519 seed into a signing key.
pub(crate) fn signing_key(seed: &[u8]) -> Result<SigningKey> {
    let seed: &[u8; SECRET_KEY_LENGTH] = seed.try_into().map_err(|_| Error::MalformedSignerKey)?;
    Ok(SigningKey::from_bytes(seed))
}

/// Strict ed25519 verification of `sig` over `msg`.
pub(crate) fn verify_ed25519(key: &VerifyingKey, msg: &[u8], sig: &[u8]) -> bool {
    match EdSignature::from_slice(sig) {
        Ok(sig) => key.verify_strict(msg, &sig).is_ok(),
        Err(_) => false,
    }
}

/// Verifier of standard ed25519 note signatures.
#[derive(Debug, Clone)]
pub struct Ed25519Verifier {
    name: String,
    key_hash: u32,
    key: VerifyingKey,
}

impl Ed25519Verifier {
    /// Construct a verifier from a `name+hash+base64key` string.
    ///
    /// # Errors
    /// The function fails if
    /// * the string is malformed
    /// * the algorithm is not ed25519
    /// * the key hash does not match the name and key
    pub fn new(vkey: &str) -> Result<Self> {
        let vkey = VerifierKey::parse(vkey)?;
        if vkey.alg != ALG_ED25519 {
            return Err(Error::UnknownAlgorithm(vkey.alg));
        }
        let key = verifying_key(&vkey.key)?;
        let key_hash = vkey.check_hash()?;

        Ok(Self {
            name: vkey.name,
            key_hash,
            key,
        })
    }
}

impl Verifier for Ed25519Verifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn key_hash(&self) -> u32 {
        self.key_hash
    }

    fn verify(&self, msg: &[u8], sig: &[u8]) -> bool {
        verify_ed25519(&self.key, msg, sig)
    }
}

/// Signer of standard ed25519 note signatures.
#[derive(Debug)]
pub struct Ed25519Signer {
    name: String,
    key_hash: u32,
    key: SigningKey,
}

impl Ed25519Signer {
    /// Construct a signer from a `PRIVATE+KEY+name+hash+base64key` string.
    pub fn new(skey: &str) -> Result<Self> {
        let skey = SignerKey::parse(skey)?;
        if skey.alg != ALG_ED25519 {
            return Err(Error::UnknownAlgorithm(skey.alg));
        }
        let signer = Self::with_key(&skey.name, signing_key(&skey.key)?);
        if signer.key_hash != skey.declared_hash {
            return Err(Error::KeyHashMismatch {
                declared: skey.declared_hash,
                computed: signer.key_hash,
            });
        }
        Ok(signer)
    }

    /// Construct a signer from a raw 32 byte seed.
    pub fn from_seed(name: &str, seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self::with_key(name, SigningKey::from_bytes(seed))
    }

    fn with_key(name: &str, key: SigningKey) -> Self {
        let key_hash = key_hash(name, &tagged(ALG_ED25519, key.verifying_key().as_bytes()));
        Self {
            name: name.to_owned(),
            key_hash,
            key,
        }
    }

    /// The `name+hash+base64key` verifier string matching this signer.
    pub fn verifier_key(&self) -> String {
        format_verifier_key(
            &self.name,
            self.key_hash,
            ALG_ED25519,
            self.key.verifying_key().as_bytes(),
        )
    }
}

impl Signer for Ed25519Signer {
    fn name(&self) -> &str {
        &self.name
    }

    fn key_hash(&self) -> u32 {
        self.key_hash
    }

    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        Ok(self.key.sign(msg).to_bytes().to_vec())
    }

    fn verifier(&self) -> Arc<dyn Verifier> {
        Arc::new(Ed25519Verifier {
            name: self.name.clone(),
            key_hash: self.key_hash,
            key: self.key.verifying_key(),
        })
    }
}

/// Generate a fresh ed25519 note key named `name`, returning the signer and
/// verifier strings.
///
/// # Example
/// ```
/// use tlog_witness::ed25519::{generate_key, Ed25519Signer, Ed25519Verifier};
///
/// let (skey, vkey) = generate_key(&mut rand::rngs::OsRng, "example.com/witness").unwrap();
/// assert!(skey.starts_with("PRIVATE+KEY+example.com/witness+"));
/// assert!(Ed25519Signer::new(&skey).is_ok());
/// assert!(Ed25519Verifier::new(&vkey).is_ok());
/// ```
pub fn generate_key<R: CryptoRngCore + ?Sized>(rng: &mut R, name: &str) -> Result<(String, String)> {
    if !is_valid_name(name) {
        return Err(Error::InvalidName(name.to_owned()));
    }
    let key = SigningKey::generate(rng);
    let pub_key = tagged(ALG_ED25519, key.verifying_key().as_bytes());
    let hash = key_hash(name, &pub_key);

    let seed = Zeroizing::new(tagged(ALG_ED25519, key.as_bytes()));
    let skey = format!("PRIVATE+KEY+{}+{:08x}+{}", name, hash, B64.encode(&*seed));
    let vkey = format!("{}+{:08x}+{}", name, hash, B64.encode(&pub_key));
    Ok((skey, vkey))
}

/// Construct a verifier for any of the supported note algorithms, chosen by
/// the algorithm tag of `vkey`.
///
/// # Errors
/// The function fails if the string is malformed, the algorithm is unknown, or
/// the algorithm specific constructor fails.
pub fn new_verifier(vkey: &str) -> Result<Arc<dyn Verifier>> {
    let alg = VerifierKey::parse(vkey)?.alg;
    Ok(match alg {
        ALG_ED25519 => Arc::new(Ed25519Verifier::new(vkey)?),
        ALG_COSIGNATURE_V1 => Arc::new(CosignatureV1Verifier::new(vkey)?),
        ALG_RFC6962_STH => Arc::new(Rfc6962Verifier::new(vkey)?),
        alg => return Err(Error::UnknownAlgorithm(alg)),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::note;

    const MSG: &str = "test\n123\nf+7CoKgXKE/tNys9TTXcr/ad6U/K3xvznmzew9y6SP0=\n";

    #[test]
    fn generated_keys_round_trip() {
        let (skey, vkey) = generate_key(&mut rand::rngs::OsRng, "test").unwrap();
        let s = Ed25519Signer::new(&skey).unwrap();
        let v = Ed25519Verifier::new(&vkey).unwrap();
        assert_eq!(s.verifier_key(), vkey);

        let n = note::sign(MSG, &[&s]).unwrap();
        assert!(note::open(&n, &[&v]).is_ok());
    }

    #[test]
    fn generate_key_invalid_name() {
        assert!(generate_key(&mut rand::rngs::OsRng, "bad name").is_err());
        assert!(generate_key(&mut rand::rngs::OsRng, "bad+name").is_err());
    }

    #[test]
    fn signer_from_published_key() {
        let s = Ed25519Signer::new(
            "PRIVATE+KEY+Wit1+55ee4561+AeadRiG7XM4XiieCHzD8lxysXMwcViy5nYsoXURWGrlE",
        )
        .unwrap();
        assert_eq!(
            s.verifier_key(),
            "Wit1+55ee4561+AVhZSmQj9+SoL+p/nN0Hh76xXmF7QcHfytUrI1XfSClk"
        );

        assert!(matches!(
            Ed25519Signer::new("PRIVATE+KEY+Wit1+55ee4562+AeadRiG7XM4XiieCHzD8lxysXMwcViy5nYsoXURWGrlE"),
            Err(Error::KeyHashMismatch { .. })
        ));
    }

    #[test]
    fn new_verifier_dispatch() {
        for (vkey, wants_ok) in [
            ("TEST+7997405c+AQcC+FTVKf0jlTdHDY3rbevmnKxxPjigCXlVtGe6RIr6", true),
            ("bananas.sigstore.dev+12344556", false),
            ("rekor.sigstore.dev+12345678+THIS_IS_NOT_BASE64!", false),
            ("rekor.sigstore.dev+12345678+AwEB", false),
            ("TEST+NOT_A_NUMBER+AQcC+FTVKf0jlTdHDY3rbevmnKxxPjigCXlVtGe6RIr6", false),
            ("TEST+00000000+AQcC+FTVKf0jlTdHDY3rbevmnKxxPjigCXlVtGe6RIr6", false),
        ] {
            assert_eq!(new_verifier(vkey).is_ok(), wants_ok, "{vkey}");
        }
        assert!(matches!(
            new_verifier("rekor.sigstore.dev+12345678+AwEB"),
            Err(Error::UnknownAlgorithm(0x03))
        ));
    }
}
