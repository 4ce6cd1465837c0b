//! Validators composed by the ledger
//!
//! - Identity: authenticated flag plus Ed25519 proof over the instruction
//! - Derived address: recompute from seeds and compare
//! - Type tag: declared tag must equal the expected tag
//! - External target: full-identifier allow-list match
//!
//! Every check returns a typed failure; none returns a bare boolean.

use crate::crypto::{derive_address, verify_signature};
use crate::error::{ErrorKind, OpResult};
use crate::policy::Policy;
use crate::types::{Address, Participant, TypeTag};
use std::collections::BTreeSet;
use tracing::debug;

/// Validator set for one ledger
#[derive(Debug, Clone)]
pub struct Validator {
    /// Enforcement per mechanism
    policy: Policy,
    /// Ledger identity mixed into derivations
    ledger_id: Address,
    /// Seed prefix for record addresses
    record_seed: Vec<u8>,
    /// Targets allowed to receive delegated authority
    allowed_targets: BTreeSet<Address>,
}

impl Validator {
    /// Create validator
    pub fn new(
        policy: Policy,
        ledger_id: Address,
        record_seed: impl Into<Vec<u8>>,
        allowed_targets: impl IntoIterator<Item = Address>,
    ) -> Self {
        Self {
            policy,
            ledger_id,
            record_seed: record_seed.into(),
            allowed_targets: allowed_targets.into_iter().collect(),
        }
    }

    /// Active policy
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    // =========================================================================
    // IDENTITY
    // =========================================================================

    /// Confirm `participant` authorized `message`
    pub fn verify_identity(&self, participant: &Participant, message: &[u8]) -> OpResult<()> {
        if !self.policy.identity.is_strict() {
            return Ok(());
        }

        if !participant.authenticated {
            return Err(ErrorKind::MissingSignature);
        }

        let proof = participant.proof.as_ref().ok_or(ErrorKind::MissingSignature)?;
        if !verify_signature(message, proof, &participant.address) {
            debug!(principal = %participant.address, "proof does not verify");
            return Err(ErrorKind::MissingSignature);
        }

        Ok(())
    }

    // =========================================================================
    // DERIVED ADDRESS
    // =========================================================================

    /// Record address owned by `owner`
    pub fn record_address(&self, owner: &Address) -> OpResult<Address> {
        derive_address(&[&self.record_seed, owner.as_ref()], &self.ledger_id)
            .map(|(address, _)| address)
            .ok_or(ErrorKind::InvalidDerivedAddress)
    }

    /// Confirm `claimed` is the record address of `owner`
    pub fn verify_record_address(&self, claimed: &Address, owner: &Address) -> OpResult<()> {
        if !self.policy.derived_address.is_strict() {
            return Ok(());
        }

        let expected = self.record_address(owner)?;
        if expected != *claimed {
            debug!(claimed = %claimed, expected = %expected, "derived address mismatch");
            return Err(ErrorKind::InvalidDerivedAddress);
        }

        Ok(())
    }

    // =========================================================================
    // TYPE TAG
    // =========================================================================

    /// Confirm a sub-resource's declared tag equals `expected`
    pub fn verify_type_tag(&self, declared: &TypeTag, expected: &TypeTag) -> OpResult<()> {
        if !self.policy.type_tag.is_strict() {
            return Ok(());
        }

        if declared != expected {
            debug!(declared = %declared, expected = %expected, "type tag mismatch");
            return Err(ErrorKind::InvalidTypeTag);
        }

        Ok(())
    }

    // =========================================================================
    // EXTERNAL TARGET
    // =========================================================================

    /// Confirm `target` may receive delegated authority
    pub fn verify_external_target(&self, target: &Address) -> OpResult<()> {
        if !self.policy.external_target.is_strict() {
            return Ok(());
        }

        if !self.allowed_targets.contains(target) {
            debug!(target = %target, "target not allow-listed");
            return Err(ErrorKind::InvalidExternalTarget);
        }

        Ok(())
    }

    // =========================================================================
    // STRUCTURAL
    // =========================================================================

    /// Confirm the caller passed `participant` as mutable
    pub fn require_mutable(&self, participant: &Participant) -> OpResult<()> {
        if participant.mutable {
            Ok(())
        } else {
            Err(ErrorKind::ReadOnlyParticipant)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::policy::Mechanism;

    fn validator(policy: Policy) -> Validator {
        let transfer = Address::from_label("transfer");
        Validator::new(policy, Address::from_label("ledger"), b"vault".to_vec(), [transfer])
    }

    #[test]
    fn test_identity_requires_flag_and_valid_proof() {
        let v = validator(Policy::strict());
        let alice = KeyPair::from_seed(&[1u8; 32]);
        let message = b"\x02payload";

        let signed = Participant::signer(&alice, message);
        assert_eq!(v.verify_identity(&signed, message), Ok(()));

        let mut unflagged = signed.clone();
        unflagged.authenticated = false;
        assert_eq!(v.verify_identity(&unflagged, message), Err(ErrorKind::MissingSignature));

        let bare = Participant::mutable(alice.address()).claiming_authentication();
        assert_eq!(v.verify_identity(&bare, message), Err(ErrorKind::MissingSignature));

        let mallory = KeyPair::from_seed(&[2u8; 32]);
        let forged = Participant::mutable(alice.address())
            .claiming_authentication()
            .with_proof(mallory.sign(message));
        assert_eq!(v.verify_identity(&forged, message), Err(ErrorKind::MissingSignature));

        // Proof over different bytes does not carry over
        assert_eq!(v.verify_identity(&signed, b"\x03"), Err(ErrorKind::MissingSignature));
    }

    #[test]
    fn test_identity_permissive_trusts_anything() {
        let v = validator(Policy::strict().relax(Mechanism::Identity));
        let nobody = Participant::readonly(Address::from_label("victim"));
        assert_eq!(v.verify_identity(&nobody, b"x"), Ok(()));
    }

    #[test]
    fn test_record_address_check() {
        let v = validator(Policy::strict());
        let owner = KeyPair::from_seed(&[3u8; 32]).address();
        let good = v.record_address(&owner).unwrap();

        assert_eq!(v.verify_record_address(&good, &owner), Ok(()));
        assert_eq!(
            v.verify_record_address(&Address::from_label("forged"), &owner),
            Err(ErrorKind::InvalidDerivedAddress)
        );

        let relaxed = validator(Policy::strict().relax(Mechanism::DerivedAddress));
        assert_eq!(relaxed.verify_record_address(&Address::from_label("forged"), &owner), Ok(()));
    }

    #[test]
    fn test_type_tag_check() {
        let v = validator(Policy::strict());
        let real = TypeTag::from_name("custody.vault");
        let fake = TypeTag::from_name("attacker.token");

        assert_eq!(v.verify_type_tag(&real, &real), Ok(()));
        assert_eq!(v.verify_type_tag(&fake, &real), Err(ErrorKind::InvalidTypeTag));
    }

    #[test]
    fn test_external_target_full_equality() {
        let v = validator(Policy::strict());
        let transfer = Address::from_label("transfer");
        assert_eq!(v.verify_external_target(&transfer), Ok(()));

        // Same leading bytes, different tail
        let mut lookalike = *transfer.as_bytes();
        lookalike[31] ^= 1;
        assert_eq!(
            v.verify_external_target(&Address::new(lookalike)),
            Err(ErrorKind::InvalidExternalTarget)
        );
    }

    #[test]
    fn test_require_mutable() {
        let v = validator(Policy::strict());
        let address = Address::from_label("x");
        assert_eq!(v.require_mutable(&Participant::mutable(address)), Ok(()));
        assert_eq!(
            v.require_mutable(&Participant::readonly(address)),
            Err(ErrorKind::ReadOnlyParticipant)
        );
    }
}
