//! Versioned account data layout
//!
//! Every account cell is `ACCOUNT_SPACE` bytes:
//!
//! ```text
//! ┌─────────┬──────────────────────────────┬──────────────┐
//! │ version │ bincode(AccountData)         │ zero padding │
//! │  1 byte │ variable                     │              │
//! └─────────┴──────────────────────────────┴──────────────┘
//! ```
//!
//! All reads and writes go through [`read_record`], [`read_holding`] and
//! [`write`]; nothing else indexes into account bytes. A cell of all zeros
//! is a freshly allocated, uninitialized record.

use crate::error::{ErrorKind, OpResult};
use crate::types::{Holding, ResourceRecord};
use serde::{Deserialize, Serialize};

/// Fixed size of every account data cell
pub const ACCOUNT_SPACE: usize = 128;

/// Current layout version
pub const LAYOUT_VERSION: u8 = 1;

/// Typed body of an account cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountData {
    /// Custody record
    Resource(ResourceRecord),
    /// Typed sub-resource
    Holding(Holding),
}

/// Zeroed cell, as handed out by the runtime allocation step
pub fn blank() -> Vec<u8> {
    vec![0u8; ACCOUNT_SPACE]
}

/// Whether the cell has never been written
pub fn is_blank(data: &[u8]) -> bool {
    data.iter().all(|b| *b == 0)
}

/// Decode a cell; `None` for a blank cell
pub fn decode(data: &[u8]) -> OpResult<Option<AccountData>> {
    if is_blank(data) {
        return Ok(None);
    }

    let (version, body) = data.split_first().ok_or(ErrorKind::InvalidRecordData)?;
    if *version != LAYOUT_VERSION {
        return Err(ErrorKind::InvalidRecordData);
    }

    bincode::deserialize(body)
        .map(Some)
        .map_err(|_| ErrorKind::InvalidRecordData)
}

/// Encode `value` into a fresh cell
pub fn encode(value: &AccountData) -> OpResult<Vec<u8>> {
    let body = bincode::serialize(value).map_err(|_| ErrorKind::InvalidRecordData)?;
    if body.len() + 1 > ACCOUNT_SPACE {
        return Err(ErrorKind::InvalidRecordData);
    }

    let mut cell = blank();
    cell[0] = LAYOUT_VERSION;
    cell[1..1 + body.len()].copy_from_slice(&body);
    Ok(cell)
}

/// Read a custody record; a blank cell reads as uninitialized
pub fn read_record(data: &[u8]) -> OpResult<ResourceRecord> {
    match decode(data)? {
        None => Ok(ResourceRecord::uninitialized()),
        Some(AccountData::Resource(record)) => Ok(record),
        Some(AccountData::Holding(_)) => Err(ErrorKind::InvalidRecordData),
    }
}

/// Read a holding
pub fn read_holding(data: &[u8]) -> OpResult<Holding> {
    match decode(data)? {
        Some(AccountData::Holding(holding)) => Ok(holding),
        _ => Err(ErrorKind::InvalidRecordData),
    }
}

/// Overwrite `data` with `value`
pub fn write(data: &mut Vec<u8>, value: &AccountData) -> OpResult<()> {
    *data = encode(value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, ResourceStatus, TypeTag};

    fn sample_record() -> ResourceRecord {
        let mut record = ResourceRecord::active(Address::from_label("owner"), TypeTag::from_name("t"));
        record.balance = 1_000_000_000;
        record
    }

    #[test]
    fn test_blank_reads_as_uninitialized() {
        let record = read_record(&blank()).unwrap();
        assert_eq!(record.status, ResourceStatus::Uninitialized);
        assert!(read_holding(&blank()).is_err());
    }

    #[test]
    fn test_record_roundtrip_keeps_fixed_size() {
        let mut cell = blank();
        write(&mut cell, &AccountData::Resource(sample_record())).unwrap();
        assert_eq!(cell.len(), ACCOUNT_SPACE);
        assert_eq!(cell[0], LAYOUT_VERSION);
        assert_eq!(read_record(&cell).unwrap(), sample_record());
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let holding = Holding {
            type_tag: TypeTag::from_name("t"),
            owner: Address::from_label("owner"),
            amount: 5,
        };
        let cell = encode(&AccountData::Holding(holding)).unwrap();
        assert_eq!(read_record(&cell), Err(ErrorKind::InvalidRecordData));

        let cell = encode(&AccountData::Resource(sample_record())).unwrap();
        assert_eq!(read_holding(&cell), Err(ErrorKind::InvalidRecordData));
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let mut cell = encode(&AccountData::Resource(sample_record())).unwrap();
        cell[0] = 9;
        assert_eq!(read_record(&cell), Err(ErrorKind::InvalidRecordData));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let mut cell = blank();
        cell[0] = LAYOUT_VERSION;
        cell[1] = 0xff;
        cell[2] = 0xff;
        assert_eq!(read_record(&cell), Err(ErrorKind::InvalidRecordData));
    }

    #[test]
    fn test_closed_tombstone_is_not_blank() {
        let cell = encode(&AccountData::Resource(ResourceRecord::closed())).unwrap();
        assert!(!is_blank(&cell));
        assert_eq!(read_record(&cell).unwrap().status, ResourceStatus::Closed);
    }
}
