//! Errors specific to checkpoint signatures, witness policies and proofs
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
/// Enum of errors associated with checkpoint verification
pub enum Error {
    /// A verifier key string is not of the form `name+hash+base64key`, or one
    /// of its fields is malformed.
    #[error("malformed verifier id")]
    MalformedVerifierKey,
    /// A signer key string is not of the form `PRIVATE+KEY+name+hash+base64key`.
    #[error("malformed signer id")]
    MalformedSignerKey,
    /// The algorithm tag in front of the key material is not one this
    /// verifier or signer accepts.
    #[error("unknown verifier algorithm {0:#04x}")]
    UnknownAlgorithm(u8),
    /// The key hash written in a key string is not the one recomputed from the
    /// name and key material.
    #[error("key hash mismatch: declared {declared:08x}, computed {computed:08x}")]
    KeyHashMismatch {
        /// Hash found in the key string.
        declared: u32,
        /// Hash recomputed from name and key.
        computed: u32,
    },
    /// A key or log name is empty, contains whitespace or a `+`.
    #[error("invalid name {0:?}")]
    InvalidName(String),
    /// Public key material could not be decoded.
    #[error("invalid key: {0}")]
    InvalidKey(String),
    /// The DER public key decodes, but is neither an ECDSA P-256 or P-384 nor an RSA key.
    #[error("unsupported public key type")]
    UnsupportedKeyType,
    /// A signature could not be decoded.
    #[error("malformed signature")]
    MalformedSignature,
    /// A signature payload does not have the length of a cosignature/v1 signature.
    #[error("signature is not a cosignature/v1 signature ({0} bytes)")]
    NotCosignatureV1(usize),
    /// The cosigned body does not have the minimum three lines.
    #[error("cosigned note format invalid")]
    CosignedNoteFormat,
    /// A signed note is malformed.
    #[error("malformed note")]
    MalformedNote,
    /// A signature from a known verifier failed to verify.
    #[error("invalid signature for key {name}+{hash:08x}")]
    InvalidSignature {
        /// Name of the key.
        name: String,
        /// Key hash of the key.
        hash: u32,
    },
    /// A note carries no signature from any of the known verifiers.
    #[error("note has no verifiable signatures")]
    UnverifiedNote,
    /// Failure reported by an underlying signing key.
    #[error("signing failed: {0}")]
    Signing(String),
    /// The signed tree head JSON could not be parsed.
    #[error("invalid signed tree head: {0}")]
    SignedTreeHead(#[from] serde_json::Error),
    /// A URL could not be parsed or extended with the submission path.
    #[error("invalid url: {0}")]
    Url(String),

    /// The proof does not start with the `c2sp.org/tlog-proof@v1` header.
    #[error("tlog proof missing expected header")]
    ProofHeader,
    /// The `extra` line of a proof is not base64.
    #[error("tlog proof extra data not base64 encoded: {0}")]
    ProofExtraData(base64::DecodeError),
    /// The proof has no `index` line.
    #[error("tlog proof missing required index")]
    ProofMissingIndex,
    /// The index of a proof is not an unsigned 64 bit decimal.
    #[error("tlog proof index not a valid uint64: {0:?}")]
    ProofIndex(String),
    /// A hash line of a proof is not base64.
    #[error("tlog proof hash not base64 encoded: {0}")]
    ProofHashEncoding(base64::DecodeError),
    /// A hash line of a proof does not decode to 32 bytes.
    #[error("tlog proof hash length was {0}, expected 32")]
    ProofHashLength(usize),
    /// A proof line exceeds the maximum line size.
    #[error("scanning tlog proof: line longer than {0} bytes")]
    ProofScan(usize),

    /// The policy does not select a quorum.
    #[error("policy file must define a quorum")]
    MissingQuorum,
    /// The policy has more than one `quorum` line.
    #[error("line {line}: policy file must define exactly one quorum")]
    DuplicateQuorum {
        /// Line of the second `quorum`.
        line: usize,
    },
    /// The `quorum` line names an undeclared component.
    #[error("line {line}: quorum component {name:?} not found")]
    QuorumNotFound {
        /// Line of the `quorum`.
        line: usize,
        /// The unresolved name.
        name: String,
    },
    /// A policy line starts with an unknown keyword.
    #[error("line {line}: unknown keyword {keyword:?}")]
    UnknownKeyword {
        /// Offending line.
        line: usize,
        /// The keyword found.
        keyword: String,
    },
    /// A policy line has the wrong number of arguments.
    #[error("line {line}: invalid {keyword} definition: {reason}")]
    InvalidDefinition {
        /// Offending line.
        line: usize,
        /// `witness`, `group` or `quorum`.
        keyword: &'static str,
        /// What is wrong with the line.
        reason: &'static str,
    },
    /// A witness is declared with a reserved name.
    #[error("line {line}: invalid witness name {name:?}")]
    InvalidWitnessName {
        /// Offending line.
        line: usize,
        /// The reserved name.
        name: String,
    },
    /// A group is declared with a reserved name.
    #[error("line {line}: invalid group name {name:?}")]
    InvalidGroupName {
        /// Offending line.
        line: usize,
        /// The reserved name.
        name: String,
    },
    /// A component name is declared twice.
    #[error("line {line}: duplicate component name {name:?}")]
    DuplicateComponent {
        /// Offending line.
        line: usize,
        /// The name declared twice.
        name: String,
    },
    /// A group refers to a component that has not been declared yet.
    #[error("line {line}: unknown component {name:?}")]
    UnknownComponent {
        /// Offending line.
        line: usize,
        /// The unresolved name.
        name: String,
    },
    /// A group lists the same member more than once.
    #[error("line {line}: duplicate group member {name:?}")]
    DuplicateMember {
        /// Offending line.
        line: usize,
        /// The repeated member.
        name: String,
    },
    /// The threshold of a group is not in `0..=members`.
    #[error("invalid threshold {threshold:?} for {members} components")]
    InvalidThreshold {
        /// Threshold as written.
        threshold: String,
        /// Number of components of the group.
        members: usize,
    },
    /// The threshold on a `group` line is not `all`, `any` or an integer in
    /// `0..=members`.
    #[error("line {line}: invalid threshold {threshold:?} for {members} members")]
    InvalidGroupThreshold {
        /// Offending line.
        line: usize,
        /// Threshold as written.
        threshold: String,
        /// Number of members listed.
        members: usize,
    },
    /// A witness line could not be turned into a witness.
    #[error("line {line}: invalid witness {name:?}: {source}")]
    InvalidWitness {
        /// Offending line.
        line: usize,
        /// Name of the witness.
        name: String,
        /// Underlying verifier or URL error.
        source: Box<Error>,
    },
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::Url(err.to_string())
    }
}
