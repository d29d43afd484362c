//! Decoded chain events as delivered by the chain client.
//!
//! Fields are kept close to what the chain hands over: addresses and hashes
//! are raw byte strings, and log metadata may be missing on pending logs.
//! The normalizer is responsible for checking and coercing them.

use alloy::primitives::{Bytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three watched contract events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TipSent,
    ProfileCreated,
    ProfileUpdated,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::TipSent,
        EventKind::ProfileCreated,
        EventKind::ProfileUpdated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TipSent => "tip_sent",
            EventKind::ProfileCreated => "profile_created",
            EventKind::ProfileUpdated => "profile_updated",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            EventKind::TipSent => 0,
            EventKind::ProfileCreated => 1,
            EventKind::ProfileUpdated => 2,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log metadata shared by every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogMeta {
    /// Transaction hash bytes (expected 32).
    pub tx_hash: Option<Bytes>,
    /// Block timestamp in seconds.
    pub block_timestamp: Option<u64>,
    pub block_number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTipSent {
    pub tip_id: U256,
    pub from: Bytes,
    pub to: Bytes,
    pub from_username: String,
    pub to_username: String,
    pub amount: U256,
    pub platform_fee: U256,
    /// Absent when the emitting contract leaves the split implicit.
    pub recipient_amount: Option<U256>,
    pub message: String,
    pub meta: LogMeta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProfileCreated {
    pub user: Bytes,
    pub username: String,
    pub credit_score: U256,
    pub meta: LogMeta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProfileUpdated {
    pub user: Bytes,
    pub username: String,
    pub profile_image: String,
    pub meta: LogMeta,
}

/// A decoded contract event, consumed once by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    TipSent(RawTipSent),
    ProfileCreated(RawProfileCreated),
    ProfileUpdated(RawProfileUpdated),
}

impl RawEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RawEvent::TipSent(_) => EventKind::TipSent,
            RawEvent::ProfileCreated(_) => EventKind::ProfileCreated,
            RawEvent::ProfileUpdated(_) => EventKind::ProfileUpdated,
        }
    }

    pub fn meta(&self) -> &LogMeta {
        match self {
            RawEvent::TipSent(e) => &e.meta,
            RawEvent::ProfileCreated(e) => &e.meta,
            RawEvent::ProfileUpdated(e) => &e.meta,
        }
    }
}
