//! Instruction wire encoding
//!
//! `[discriminator: u8][payload: little-endian fixed-width integers]`
//!
//! | Discriminator | Operation  | Payload       |
//! |---------------|------------|---------------|
//! | 0             | Initialize | none          |
//! | 1             | Deposit    | amount: u64   |
//! | 2             | Withdraw   | amount: u64   |
//! | 3             | Close      | none          |
//! | 4             | Transfer   | amount: u64   |

use crate::error::{ErrorKind, OpResult};
use crate::types::Participant;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Operation {
    /// Create the record
    Initialize = 0,
    /// Credit the record
    Deposit = 1,
    /// Debit the record and pay out through an external target
    Withdraw = 2,
    /// Tear the record down
    Close = 3,
    /// Move a typed holding into custody
    Transfer = 4,
}

impl Operation {
    /// Parse from discriminator
    pub fn from_discriminator(d: u8) -> Option<Self> {
        match d {
            0 => Some(Operation::Initialize),
            1 => Some(Operation::Deposit),
            2 => Some(Operation::Withdraw),
            3 => Some(Operation::Close),
            4 => Some(Operation::Transfer),
            _ => None,
        }
    }

    /// Wire discriminator
    pub fn discriminator(&self) -> u8 {
        *self as u8
    }

    /// Number of participant descriptors the operation reads
    pub fn required_participants(&self) -> usize {
        match self {
            Operation::Initialize | Operation::Deposit | Operation::Close => 2,
            Operation::Withdraw | Operation::Transfer => 4,
        }
    }

    /// snake_case name
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Initialize => "initialize",
            Operation::Deposit => "deposit",
            Operation::Withdraw => "withdraw",
            Operation::Close => "close",
            Operation::Transfer => "transfer",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Create the record
    Initialize,
    /// Credit the record
    Deposit {
        /// Amount credited
        amount: u64,
    },
    /// Debit the record and pay out
    Withdraw {
        /// Amount debited
        amount: u64,
    },
    /// Tear the record down
    Close,
    /// Move a typed holding into custody
    Transfer {
        /// Amount moved
        amount: u64,
    },
}

impl Instruction {
    /// Operation of this instruction
    pub fn operation(&self) -> Operation {
        match self {
            Instruction::Initialize => Operation::Initialize,
            Instruction::Deposit { .. } => Operation::Deposit,
            Instruction::Withdraw { .. } => Operation::Withdraw,
            Instruction::Close => Operation::Close,
            Instruction::Transfer { .. } => Operation::Transfer,
        }
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![self.operation().discriminator()];
        match self {
            Instruction::Deposit { amount }
            | Instruction::Withdraw { amount }
            | Instruction::Transfer { amount } => bytes.extend_from_slice(&amount.to_le_bytes()),
            Instruction::Initialize | Instruction::Close => {}
        }
        bytes
    }

    /// Decode from wire bytes; payload length must match exactly
    pub fn decode(data: &[u8]) -> OpResult<Self> {
        let (discriminator, payload) = data
            .split_first()
            .ok_or(ErrorKind::InvalidInstructionData)?;
        let operation =
            Operation::from_discriminator(*discriminator).ok_or(ErrorKind::InvalidInstructionData)?;

        match operation {
            Operation::Initialize => empty(payload).map(|_| Instruction::Initialize),
            Operation::Close => empty(payload).map(|_| Instruction::Close),
            Operation::Deposit => read_u64(payload).map(|amount| Instruction::Deposit { amount }),
            Operation::Withdraw => read_u64(payload).map(|amount| Instruction::Withdraw { amount }),
            Operation::Transfer => read_u64(payload).map(|amount| Instruction::Transfer { amount }),
        }
    }
}

fn empty(payload: &[u8]) -> OpResult<()> {
    if payload.is_empty() {
        Ok(())
    } else {
        Err(ErrorKind::InvalidInstructionData)
    }
}

fn read_u64(payload: &[u8]) -> OpResult<u64> {
    let bytes: [u8; 8] = payload
        .try_into()
        .map_err(|_| ErrorKind::InvalidInstructionData)?;
    Ok(u64::from_le_bytes(bytes))
}

/// Instruction bytes plus the participants it is applied with
#[derive(Debug, Clone)]
pub struct Call {
    /// Encoded instruction
    pub data: Vec<u8>,

    /// Ordered participant descriptors
    pub participants: Vec<Participant>,
}

impl Call {
    /// Call from a decoded instruction
    pub fn new(instruction: Instruction, participants: Vec<Participant>) -> Self {
        Self {
            data: instruction.encode(),
            participants,
        }
    }
}

/// Ordered calls committed or rolled back as a unit
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    /// Calls in execution order
    pub calls: Vec<Call>,
}

impl Transaction {
    /// Empty transaction
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call
    pub fn push(mut self, call: Call) -> Self {
        self.calls.push(call);
        self
    }
}
