//! Cryptographic operations for the custody engine
//!
//! This module provides:
//! - Ed25519 key pair generation and signing (principals' proofs)
//! - SHA-256 address derivation for records
//! - The off-curve test that keeps derived addresses keyless

use crate::types::{Address, Signature};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};

/// Domain separator appended to every derivation preimage
const DERIVATION_MARKER: &[u8] = b"CustodyDerivedAddress";

/// Ed25519 key pair for a principal
#[derive(Debug)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_seed(&rand::random::<[u8; 32]>())
    }

    /// Create from seed (32 bytes) - deterministic generation
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Principal address (the verifying key bytes)
    pub fn address(&self) -> Address {
        Address::new(self.verifying_key.to_bytes())
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> Signature {
        let signature = self.signing_key.sign(message);
        Signature::from_bytes(signature.to_bytes())
    }
}

/// Verify a proof by `address` over `message`
pub fn verify_signature(message: &[u8], signature: &Signature, address: &Address) -> bool {
    signature.verify(message, address.as_bytes())
}

/// Whether the bytes decode to an Ed25519 point (i.e. could have a private key)
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    VerifyingKey::from_bytes(bytes).is_ok()
}

/// Derive the address for `seeds` under `ledger_id`
///
/// Salts are tried from 255 downward; the first digest that is not a curve
/// point wins, so no key pair can ever sign for the returned address.
/// Returns `None` only if every salt lands on the curve.
pub fn derive_address(seeds: &[&[u8]], ledger_id: &Address) -> Option<(Address, u8)> {
    (0..=u8::MAX).rev().find_map(|salt| {
        let candidate = derive_with_salt(seeds, salt, ledger_id);
        (!is_on_curve(candidate.as_bytes())).then_some((candidate, salt))
    })
}

/// Derivation for a known salt (no curve check)
pub fn derive_with_salt(seeds: &[&[u8]], salt: u8, ledger_id: &Address) -> Address {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update([salt]);
    hasher.update(ledger_id.as_bytes());
    hasher.update(DERIVATION_MARKER);
    Address::new(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_from_seed() {
        let seed = [42u8; 32];
        let keypair1 = KeyPair::from_seed(&seed);
        let keypair2 = KeyPair::from_seed(&seed);

        // Same seed should produce same keys
        assert_eq!(keypair1.address(), keypair2.address());
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = KeyPair::generate();
        let message = b"withdraw";
        let signature = keypair.sign(message);

        assert!(verify_signature(message, &signature, &keypair.address()));
        assert!(!verify_signature(b"deposit", &signature, &keypair.address()));

        let other = KeyPair::generate();
        assert!(!verify_signature(message, &signature, &other.address()));
    }

    #[test]
    fn test_principal_address_is_on_curve() {
        let keypair = KeyPair::generate();
        assert!(is_on_curve(keypair.address().as_bytes()));
    }

    #[test]
    fn test_derive_is_deterministic_and_off_curve() {
        let ledger = Address::from_label("ledger");
        let owner = KeyPair::from_seed(&[7u8; 32]).address();

        let (a1, s1) = derive_address(&[b"vault", owner.as_ref()], &ledger).unwrap();
        let (a2, s2) = derive_address(&[b"vault", owner.as_ref()], &ledger).unwrap();

        assert_eq!(a1, a2);
        assert_eq!(s1, s2);
        assert!(!is_on_curve(a1.as_bytes()));
        assert_eq!(derive_with_salt(&[b"vault", owner.as_ref()], s1, &ledger), a1);
    }

    #[test]
    fn test_derive_depends_on_every_input() {
        let ledger = Address::from_label("ledger");
        let other_ledger = Address::from_label("other-ledger");
        let alice = KeyPair::from_seed(&[1u8; 32]).address();
        let bob = KeyPair::from_seed(&[2u8; 32]).address();

        let (base, _) = derive_address(&[b"vault", alice.as_ref()], &ledger).unwrap();
        let (by_owner, _) = derive_address(&[b"vault", bob.as_ref()], &ledger).unwrap();
        let (by_seed, _) = derive_address(&[b"pool", alice.as_ref()], &ledger).unwrap();
        let (by_ledger, _) = derive_address(&[b"vault", alice.as_ref()], &other_ledger).unwrap();

        assert_ne!(base, by_owner);
        assert_ne!(base, by_seed);
        assert_ne!(base, by_ledger);
    }
}
