//! Trust verification for transparency log checkpoints.
//!
//! A checkpoint is a signed note committing to the state of a log. This crate
//! verifies the signatures found on checkpoints, in the witness cosignature
//! format of <https://c2sp.org/tlog-cosignature> and in the RFC 6962 signed
//! tree head format of static CT logs, and decides whether a checkpoint is
//! cosigned by enough witnesses according to a witness policy.
//!
//! ```
//! use tlog_witness::cosig::CosignatureV1Signer;
//! use tlog_witness::{note, WitnessGroup};
//!
//! let group = WitnessGroup::from_policy(
//!     "witness w1 Wit1+55ee4561+AVhZSmQj9+SoL+p/nN0Hh76xXmF7QcHfytUrI1XfSClk https://w1.example.com/\n\
//!      quorum w1\n",
//! )
//! .unwrap();
//!
//! let witness =
//!     CosignatureV1Signer::new("PRIVATE+KEY+Wit1+55ee4561+AeadRiG7XM4XiieCHzD8lxysXMwcViy5nYsoXURWGrlE")
//!         .unwrap();
//! let checkpoint = note::sign("example.com/log\n1\nf+7CoKgXKE/tNys9TTXcr/ad6U/K3xvznmzew9y6SP0=\n", &[&witness]).unwrap();
//! assert!(group.satisfied(&checkpoint));
//! ```
//!
//! Inclusion proofs travelling with a checkpoint are encoded by [`proof::TLogProof`].
#![warn(missing_docs, rust_2018_idioms)]

pub mod common;
pub mod cosig;
pub mod ed25519;
mod errors;
pub mod note;
pub mod policy;
pub mod proof;
pub mod rfc6962;
pub mod traits;
pub mod witness;

pub use crate::errors::{Error, Result};
pub use crate::witness::{Component, Witness, WitnessGroup};
