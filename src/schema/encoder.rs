//! ABI encoding of normalized records into stream payloads.

use alloy::primitives::{keccak256, Bytes, B256};
use alloy::sol_types::SolValue;
use thiserror::Error;

use crate::schema::records::{
    LeaderboardUpdateData, NormalizedRecord, ProfileCreatedData, ProfileUpdatedData, RecordKind,
    TipEventData,
};

/// Errors from encoding or decoding a payload.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to decode {kind} payload: {reason}")]
    Decode { kind: RecordKind, reason: String },
}

/// One record ready to be appended to the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPayload {
    pub kind: RecordKind,
    /// `keccak256` of the schema string.
    pub schema_id: B256,
    /// Deterministic id so the stream can drop duplicate deliveries.
    pub data_id: B256,
    pub data: Bytes,
}

/// Returns the schema id for a record tag.
pub fn schema_id(kind: RecordKind) -> B256 {
    keccak256(kind.schema().as_bytes())
}

/// Stateless encoder between `NormalizedRecord` and wire bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaEncoder;

impl SchemaEncoder {
    pub fn new() -> Self {
        Self
    }

    pub fn encode(&self, record: &NormalizedRecord) -> StreamPayload {
        let kind = record.kind();
        let data = match record {
            NormalizedRecord::Tip(r) => r.abi_encode(),
            NormalizedRecord::ProfileCreated(r) => r.abi_encode(),
            NormalizedRecord::ProfileUpdated(r) => r.abi_encode(),
            NormalizedRecord::LeaderboardUpdate(r) => r.abi_encode(),
        };
        StreamPayload {
            kind,
            schema_id: schema_id(kind),
            data_id: data_id(record),
            data: Bytes::from(data),
        }
    }

    pub fn decode(&self, kind: RecordKind, data: &[u8]) -> Result<NormalizedRecord, SchemaError> {
        let err = |e: alloy::sol_types::Error| SchemaError::Decode {
            kind,
            reason: e.to_string(),
        };
        let record = match kind {
            RecordKind::Tip => NormalizedRecord::Tip(TipEventData::abi_decode(data).map_err(err)?),
            RecordKind::ProfileCreated => {
                NormalizedRecord::ProfileCreated(ProfileCreatedData::abi_decode(data).map_err(err)?)
            }
            RecordKind::ProfileUpdated => {
                NormalizedRecord::ProfileUpdated(ProfileUpdatedData::abi_decode(data).map_err(err)?)
            }
            RecordKind::LeaderboardUpdate => NormalizedRecord::LeaderboardUpdate(
                LeaderboardUpdateData::abi_decode(data).map_err(err)?,
            ),
        };
        Ok(record)
    }
}

fn data_id(record: &NormalizedRecord) -> B256 {
    let mut key = Vec::with_capacity(96);
    key.extend_from_slice(record.kind().as_str().as_bytes());
    match record {
        NormalizedRecord::Tip(r) => {
            key.extend_from_slice(r.txHash.as_slice());
            key.extend_from_slice(&r.id.to_be_bytes());
        }
        NormalizedRecord::ProfileCreated(r) => {
            key.extend_from_slice(r.txHash.as_slice());
            key.extend_from_slice(r.userAddress.as_slice());
        }
        NormalizedRecord::ProfileUpdated(r) => {
            key.extend_from_slice(r.txHash.as_slice());
            key.extend_from_slice(r.userAddress.as_slice());
        }
        NormalizedRecord::LeaderboardUpdate(r) => {
            key.extend_from_slice(r.userAddress.as_slice());
            key.extend_from_slice(&r.tipsReceived.to_be_bytes());
            key.extend_from_slice(&r.tipsSent.to_be_bytes());
        }
    }
    keccak256(&key)
}
