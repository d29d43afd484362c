//! Maps raw chain events onto the canonical wire records.
//!
//! Pure and deterministic: no I/O, no clock, no shared state. A failed
//! coercion yields `MalformedEventError` and the caller drops the event.

use alloy::primitives::{Address, Bytes, B256};
use thiserror::Error;

use crate::events::raw::{EventKind, LogMeta, RawEvent};
use crate::schema::{NormalizedRecord, ProfileCreatedData, ProfileUpdatedData, TipEventData};

/// A required field was absent or could not be coerced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {kind} event: {field} {reason}")]
pub struct MalformedEventError {
    pub kind: EventKind,
    pub field: &'static str,
    pub reason: String,
}

impl MalformedEventError {
    fn new(kind: EventKind, field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            field,
            reason: reason.into(),
        }
    }
}

/// Normalize one raw event into its record.
pub fn normalize(event: RawEvent) -> Result<NormalizedRecord, MalformedEventError> {
    let kind = event.kind();
    match event {
        RawEvent::TipSent(e) => {
            let (timestamp, tx_hash) = meta_fields(kind, &e.meta)?;
            let id = u64::try_from(e.tip_id)
                .map_err(|_| MalformedEventError::new(kind, "id", "does not fit in uint64"))?;
            let recipient_amount = match e.recipient_amount {
                Some(amount) => amount,
                None => e.amount.checked_sub(e.platform_fee).ok_or_else(|| {
                    MalformedEventError::new(kind, "platformFee", "exceeds amount")
                })?,
            };
            Ok(NormalizedRecord::Tip(TipEventData {
                id,
                fromAddress: address(kind, "fromAddress", &e.from)?,
                toAddress: address(kind, "toAddress", &e.to)?,
                fromUsername: e.from_username,
                toUsername: e.to_username,
                amount: e.amount,
                platformFee: e.platform_fee,
                recipientAmount: recipient_amount,
                message: e.message,
                timestamp,
                txHash: tx_hash,
            }))
        }
        RawEvent::ProfileCreated(e) => {
            let (timestamp, tx_hash) = meta_fields(kind, &e.meta)?;
            Ok(NormalizedRecord::ProfileCreated(ProfileCreatedData {
                userAddress: address(kind, "userAddress", &e.user)?,
                username: e.username,
                creditScore: e.credit_score,
                timestamp,
                txHash: tx_hash,
            }))
        }
        RawEvent::ProfileUpdated(e) => {
            let (timestamp, tx_hash) = meta_fields(kind, &e.meta)?;
            Ok(NormalizedRecord::ProfileUpdated(ProfileUpdatedData {
                userAddress: address(kind, "userAddress", &e.user)?,
                username: e.username,
                profileImageRef: e.profile_image,
                timestamp,
                txHash: tx_hash,
            }))
        }
    }
}

fn meta_fields(kind: EventKind, meta: &LogMeta) -> Result<(u64, B256), MalformedEventError> {
    let timestamp = meta
        .block_timestamp
        .ok_or_else(|| MalformedEventError::new(kind, "timestamp", "is missing"))?;
    let tx_hash = meta
        .tx_hash
        .as_ref()
        .ok_or_else(|| MalformedEventError::new(kind, "txHash", "is missing"))?;
    if tx_hash.len() != 32 {
        return Err(MalformedEventError::new(
            kind,
            "txHash",
            format!("has {} bytes, expected 32", tx_hash.len()),
        ));
    }
    Ok((timestamp, B256::from_slice(tx_hash)))
}

fn address(kind: EventKind, field: &'static str, raw: &Bytes) -> Result<Address, MalformedEventError> {
    if raw.len() != 20 {
        return Err(MalformedEventError::new(
            kind,
            field,
            format!("has {} bytes, expected 20", raw.len()),
        ));
    }
    Ok(Address::from_slice(raw))
}
