//! Concord Crypto
//!
//! Recoverable secp256k1 signatures over keccak-256 digests. Oracles prove
//! membership of a service agreement by signing its id; the registry
//! recovers each signer and compares it against the listed identity.

pub mod keys;
pub mod sign;

pub use keys::{address_of, SigningKeypair};
pub use sign::{recover_signer, signed_message_digest, OracleSignature, SignatureError};
