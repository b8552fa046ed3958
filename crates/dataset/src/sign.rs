//! Commit signing.
//!
//! A snapshot is signed over its *signing bytes*: the canonical JSON
//! encoding of the snapshot with every store address, derived field, and
//! the signature itself removed. Those exclusions make the encoding stable
//! between the moment of signing (mid-save, before the root is assembled)
//! and a later load of the stored snapshot.

use super::{strip_derived, Dataset};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("commit is missing a signature")]
    MissingSignature,

    #[error("signature is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("signature has wrong length: {0} bytes")]
    Length(usize),

    #[error("signature verification failed")]
    Invalid,
}

/// The deterministic byte encoding a commit signature covers.
pub fn signing_bytes(ds: &Dataset) -> Vec<u8> {
    let mut doc = serde_json::to_value(ds).expect("datasets always encode");
    strip_derived(&mut doc);
    serde_json::to_vec(&doc).expect("documents always encode")
}

/// Sign `ds` with `key`, returning the base64 signature for
/// `commit.signature`.
pub fn sign(ds: &Dataset, key: &SigningKey) -> String {
    let signature = key.sign(&signing_bytes(ds));
    base64::encode(signature.to_bytes())
}

/// Verify `ds.commit.signature` against the public key paired with the key
/// that signed it.
pub fn verify(ds: &Dataset, key: &VerifyingKey) -> Result<(), SignatureError> {
    let encoded = ds
        .commit
        .as_ref()
        .map(|commit| commit.signature.as_str())
        .filter(|sig| !sig.is_empty())
        .ok_or(SignatureError::MissingSignature)?;

    let raw = base64::decode(encoded)?;
    let raw: [u8; 64] = raw
        .as_slice()
        .try_into()
        .map_err(|_| SignatureError::Length(raw.len()))?;

    key.verify(&signing_bytes(ds), &Signature::from_bytes(&raw))
        .map_err(|_| SignatureError::Invalid)
}
