use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use thiserror::Error;

use concord_core::{keccak256, Address, CoordinatorError};

use crate::keys::address_of;

const SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed signature: {0}")]
    Malformed(String),
    #[error("invalid secret key: {0}")]
    InvalidKey(String),
}

impl From<SignatureError> for CoordinatorError {
    fn from(e: SignatureError) -> Self {
        CoordinatorError::MalformedSignature(e.to_string())
    }
}

/// An `(r, s, v)` recoverable signature. `v` is `27`/`28` (or `0`/`1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub v: u8,
}

impl OracleSignature {
    /// Parse the 65-byte `r || s || v` form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        if bytes.len() != 65 {
            return Err(SignatureError::Malformed(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self { r, s, v: bytes[64] })
    }

    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }

    fn recovery_id(&self) -> Result<RecoveryId, SignatureError> {
        let byte = match self.v {
            0 | 1 => self.v,
            27 | 28 => self.v - 27,
            other => {
                return Err(SignatureError::Malformed(format!(
                    "recovery byte {other} out of range"
                )))
            }
        };
        RecoveryId::from_byte(byte)
            .ok_or_else(|| SignatureError::Malformed(format!("recovery byte {byte}")))
    }
}

/// The digest wallets sign for a 32-byte hash: keccak-256 of the
/// signed-message header followed by the hash.
pub fn signed_message_digest(hash: &[u8; 32]) -> [u8; 32] {
    let mut message = Vec::with_capacity(SIGNED_MESSAGE_PREFIX.len() + 32);
    message.extend_from_slice(SIGNED_MESSAGE_PREFIX);
    message.extend_from_slice(hash);
    keccak256(&message)
}

/// Recover the identity that produced `signature` over `digest`.
///
/// Only fails when the signature cannot be recovered at all. A well-formed
/// signature by the "wrong" key recovers that key's identity; deciding
/// whether it is acceptable is the caller's job.
pub fn recover_signer(
    digest: &[u8; 32],
    signature: &OracleSignature,
) -> Result<Address, SignatureError> {
    let recovery_id = signature.recovery_id()?;
    let mut rs = [0u8; 64];
    rs[..32].copy_from_slice(&signature.r);
    rs[32..].copy_from_slice(&signature.s);
    let sig = Signature::from_slice(&rs).map_err(|e| SignatureError::Malformed(e.to_string()))?;
    let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|e| SignatureError::Malformed(e.to_string()))?;
    Ok(address_of(&key))
}
