//! secp256k1 ECDSA verification of LNURL-auth signatures.
//!
//! The signed message is the raw 32-byte `k1`, not a hash of it. Signatures
//! are accepted in DER or 64-byte compact form. High-S signatures are not
//! normalized and fail verification.

use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, Verification};
use thiserror::Error;

/// Length of a compressed secp256k1 public key.
pub const COMPRESSED_KEY_LEN: usize = 33;

const COMPACT_SIG_LEN: usize = 64;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    #[error("public key is not a compressed secp256k1 point")]
    InvalidPublicKey,
    #[error("signature is not valid DER or compact encoding")]
    InvalidSignatureEncoding,
}

/// Verify `sig` over `secret` under the compressed public key `key`.
///
/// Returns `Ok(false)` when the signature is well formed but does not match,
/// including the high-S twin of an otherwise valid signature.
///
/// # Errors
/// `InvalidPublicKey` when `key` is not a 33-byte point on the curve,
/// `InvalidSignatureEncoding` when `sig` cannot be parsed. The key is checked
/// first.
pub fn verify<C: Verification>(
    secp: &Secp256k1<C>,
    secret: &[u8; 32],
    sig: &[u8],
    key: &[u8],
) -> Result<bool, VerifyError> {
    let public_key = parse_public_key(key)?;
    let signature = parse_signature(sig)?;

    let message = Message::from_digest(*secret);
    Ok(secp.verify_ecdsa(&message, &signature, &public_key).is_ok())
}

fn parse_public_key(key: &[u8]) -> Result<PublicKey, VerifyError> {
    if key.len() != COMPRESSED_KEY_LEN {
        return Err(VerifyError::InvalidPublicKey);
    }
    PublicKey::from_slice(key).map_err(|_| VerifyError::InvalidPublicKey)
}

fn parse_signature(sig: &[u8]) -> Result<Signature, VerifyError> {
    let parsed = if sig.len() == COMPACT_SIG_LEN {
        Signature::from_compact(sig)
    } else {
        Signature::from_der(sig)
    };
    parsed.map_err(|_| VerifyError::InvalidSignatureEncoding)
}
