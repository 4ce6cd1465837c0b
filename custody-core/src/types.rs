//! Core types for the custody engine
//!
//! All persisted types are designed for:
//! - Deterministic serialization (bincode, see [`crate::layout`])
//! - Fixed-width arithmetic (`u64` balances, never negative)
//! - Human-readable hex when rendered through serde_json or TOML

use crate::error::{ErrorKind, OpResult};
use crate::instruction::Operation;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// 32-byte identifier for principals, records, holdings and targets
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 32]);

impl Address {
    /// The all-zero address, used as the neutral custody authority
    pub const ZERO: Address = Address([0u8; 32]);

    /// Create from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse from a 64-character hex string
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let bytes: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Lowercase hex rendering
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Deterministic address from a label (fixtures, well-known ids)
    pub fn from_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"label:");
        hasher.update(label.as_bytes());
        Self(hasher.finalize().into())
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 hex chars are enough to tell fixtures apart in logs
        write!(f, "Address({}..)", &self.to_hex()[..8])
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Address::from_hex(&s)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid address: {}", s)))
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Address)
        }
    }
}

/// 8-byte type discriminator declared by a record or holding
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TypeTag([u8; 8]);

impl TypeTag {
    /// Zeroed tag (closed records)
    pub const ZERO: TypeTag = TypeTag([0u8; 8]);

    /// Tag for a named resource type: first 8 bytes of SHA-256("tag:" || name)
    pub fn from_name(name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"tag:");
        hasher.update(name.as_bytes());
        let digest: [u8; 32] = hasher.finalize().into();
        let mut tag = [0u8; 8];
        tag.copy_from_slice(&digest[..8]);
        Self(tag)
    }

}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeTag({})", self)
    }
}

/// Record lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ResourceStatus {
    /// Allocated but not yet initialized
    Uninitialized = 0,
    /// Initialized and accepting operations
    Active = 1,
    /// Torn down (terminal)
    Closed = 2,
}

impl ResourceStatus {
    /// Gate `operation` on this status
    ///
    /// Initialize is the only way out of Uninitialized and Closed admits
    /// nothing.
    pub fn admits(&self, operation: Operation) -> OpResult<()> {
        use ResourceStatus::*;

        match (self, operation) {
            (Closed, _) => Err(ErrorKind::ResourceClosed),
            (Uninitialized, Operation::Initialize) => Ok(()),
            (Uninitialized, _) => Err(ErrorKind::NotInitialized),
            (Active, Operation::Initialize) => Err(ErrorKind::AlreadyInitialized),
            (Active, _) => Ok(()),
        }
    }
}

/// The custodied balance-bearing record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Owner principal (immutable once set)
    pub owner: Address,

    /// Custodied balance
    pub balance: u64,

    /// Declared type tag
    pub type_tag: TypeTag,

    /// Lifecycle status
    pub status: ResourceStatus,

    /// Reentry guard flag
    pub lock: bool,
}

impl ResourceRecord {
    /// Record as allocated by the runtime, before Initialize
    pub fn uninitialized() -> Self {
        Self {
            owner: Address::ZERO,
            balance: 0,
            type_tag: TypeTag::ZERO,
            status: ResourceStatus::Uninitialized,
            lock: false,
        }
    }

    /// Freshly initialized record
    pub fn active(owner: Address, type_tag: TypeTag) -> Self {
        Self {
            owner,
            balance: 0,
            type_tag,
            status: ResourceStatus::Active,
            lock: false,
        }
    }

    /// Tombstone left behind by Close: every field zeroed except the status marker
    pub fn closed() -> Self {
        Self {
            owner: Address::ZERO,
            balance: 0,
            type_tag: TypeTag::ZERO,
            status: ResourceStatus::Closed,
            lock: false,
        }
    }
}

/// Typed sub-resource read by the type tag validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    /// Declared type tag
    pub type_tag: TypeTag,

    /// Owner of the holding (a principal or a record address)
    pub owner: Address,

    /// Amount held
    pub amount: u64,
}

/// Point-in-time view of a record, returned by every successful operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecordSnapshot {
    /// Record address
    pub address: Address,

    /// Authority currently allowed to interpret the account data
    pub custodian: Address,

    /// Native value held at the address
    pub native_value: u64,

    /// Owner principal
    pub owner: Address,

    /// Custodied balance
    pub balance: u64,

    /// Declared type tag
    pub type_tag: TypeTag,

    /// Lifecycle status
    pub status: ResourceStatus,

    /// Reentry guard flag
    pub locked: bool,
}

/// Ed25519 signature carried as an authorization proof
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    bytes: [u8; 64],
}

impl Signature {
    /// Create from bytes
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    /// Verify signature against a 32-byte public key
    pub fn verify(&self, message: &[u8], public_key: &[u8; 32]) -> bool {
        use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};

        let signature = DalekSignature::from_bytes(&self.bytes);

        let verifying_key = match VerifyingKey::from_bytes(public_key) {
            Ok(key) => key,
            Err(_) => return false,
        };

        verifying_key.verify(message, &signature).is_ok()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", hex::encode(&self.bytes[..4]))
    }
}

/// Participant descriptor passed alongside an instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Participant identifier
    pub address: Address,

    /// Caller claims this participant authorized the call
    pub authenticated: bool,

    /// Operation may write this participant
    pub mutable: bool,

    /// Authorization proof over the instruction bytes
    pub proof: Option<Signature>,
}

impl Participant {
    /// Read-only, unauthenticated participant
    pub fn readonly(address: Address) -> Self {
        Self {
            address,
            authenticated: false,
            mutable: false,
            proof: None,
        }
    }

    /// Mutable, unauthenticated participant
    pub fn mutable(address: Address) -> Self {
        Self {
            mutable: true,
            ..Self::readonly(address)
        }
    }

    /// Mutable participant signing `message` with `keypair`
    pub fn signer(keypair: &crate::crypto::KeyPair, message: &[u8]) -> Self {
        Self {
            address: keypair.address(),
            authenticated: true,
            mutable: true,
            proof: Some(keypair.sign(message)),
        }
    }

    /// Flag as authenticated without attaching any proof
    pub fn claiming_authentication(mut self) -> Self {
        self.authenticated = true;
        self
    }

    /// Attach an arbitrary proof
    pub fn with_proof(mut self, proof: Signature) -> Self {
        self.proof = Some(proof);
        self
    }
}
