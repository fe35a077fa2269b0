use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use rand::rngs::OsRng;

use concord_core::{keccak256, Address};

use crate::sign::{signed_message_digest, OracleSignature, SignatureError};

/// Derive the 20-byte identity of a public key: the last 20 bytes of the
/// keccak-256 hash of the uncompressed point without its prefix byte.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = PublicKey::from(key).to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// secp256k1 keypair used by oracles and agreement tooling.
pub struct SigningKeypair {
    signing_key: SigningKey,
}

impl SigningKeypair {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Build a keypair from a 32-byte secret scalar.
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Result<Self, SignatureError> {
        let signing_key = SigningKey::from_slice(secret)
            .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
        Ok(Self { signing_key })
    }

    pub fn secret_key_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.signing_key.to_bytes());
        out
    }

    pub fn address(&self) -> Address {
        address_of(self.signing_key.verifying_key())
    }

    /// Sign a 32-byte digest as-is.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<OracleSignature, SignatureError> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| SignatureError::Malformed(e.to_string()))?;
        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(OracleSignature {
            r,
            s,
            v: 27 + recovery_id.to_byte(),
        })
    }

    /// Sign a 32-byte hash the way wallets sign messages: prefixed with the
    /// signed-message header and re-hashed.
    pub fn sign_message_hash(&self, hash: &[u8; 32]) -> Result<OracleSignature, SignatureError> {
        self.sign_digest(&signed_message_digest(hash))
    }
}

impl std::fmt::Debug for SigningKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeypair")
            .field("address", &hex::encode(self.address()))
            .finish()
    }
}
