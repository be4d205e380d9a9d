//! Traits that define the signature capabilities used on checkpoints
use crate::errors::Result;
use std::sync::Arc;

/// Trait that defines a checkpoint signature verifier.
///
/// A verifier is identified on a signature line by its name and its key
/// hash. Failing verification is an expected outcome, so `verify` reports a
/// `bool` instead of an error.
///
/// # Example
/// ```
/// use tlog_witness::cosig::CosignatureV1Verifier;
/// use tlog_witness::traits::Verifier;
///
/// let v = CosignatureV1Verifier::new("Wit1+55ee4561+AVhZSmQj9+SoL+p/nN0Hh76xXmF7QcHfytUrI1XfSClk")
///     .unwrap();
/// assert_eq!(v.name(), "Wit1");
/// assert!(!v.verify(b"checkpoint\n1\nroot\n", &[0u8; 72]));
/// ```
pub trait Verifier: Send + Sync {
    /// Name of the key, as found on signature lines.
    fn name(&self) -> &str;
    /// Truncated hash identifying the key.
    fn key_hash(&self) -> u32;
    /// Verify `sig` over the note text `msg`.
    fn verify(&self, msg: &[u8], sig: &[u8]) -> bool;
}

/// Trait that defines a checkpoint signer.
pub trait Signer: Send + Sync {
    /// Name of the key, as written on signature lines.
    fn name(&self) -> &str;
    /// Truncated hash identifying the key.
    fn key_hash(&self) -> u32;
    /// Sign the note text `msg`, returning the signature payload without the
    /// key hash prefix.
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>>;
    /// Verifier for the signatures produced by `self`.
    fn verifier(&self) -> Arc<dyn Verifier>;
}
