//! Cryptographic primitives and protocol derivations for the client core
//!
//! This crate owns the client's *protocol*: which messages get signed, how
//! secrets and commitments are derived from those signatures, and how the
//! position record is encrypted for remote backup. The primitives behind it
//! (SHA-256, ed25519, AES-256-GCM) are deliberately hidden behind small
//! functions so the rest of the workspace never touches them directly.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod cipher;
pub mod derivation;
pub mod signer;
