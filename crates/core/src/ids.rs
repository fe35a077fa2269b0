//! Deterministic identifier derivation.
//!
//! Every field is packed into a 32-byte big-endian word (addresses are
//! left-padded) before hashing, so off-chain tooling can derive the same ids
//! from the same inputs.

use sha3::{Digest, Keccak256};

use crate::{Address, AgreementId, RequestId, ServiceAgreement};

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let result = Keccak256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

fn word_u128(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn word_u64(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

fn word_address(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address);
    word
}

/// Derive the agreement id from `payment, expiration, end_at, oracles...,
/// request_digest`.
pub fn agreement_id(agreement: &ServiceAgreement) -> AgreementId {
    let mut hasher = Keccak256::new();
    hasher.update(word_u128(agreement.payment));
    hasher.update(word_u64(agreement.expiration));
    hasher.update(word_u64(agreement.end_at));
    for oracle in &agreement.oracles {
        hasher.update(word_address(oracle));
    }
    hasher.update(agreement.request_digest);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Derive a request id from the requester, its nonce and the agreement the
/// request is raised under.
pub fn request_id(requester: &Address, nonce: u64, agreement: &AgreementId) -> RequestId {
    let mut hasher = Keccak256::new();
    hasher.update(requester);
    hasher.update(word_u64(nonce));
    hasher.update(agreement);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}
