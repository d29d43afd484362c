//! Canonical records and their wire layouts.
//!
//! Each record type is a `sol!` struct, so its field order is the wire order
//! and ABI encoding gives a fixed, self-describing layout.

use alloy::sol;
use serde::{Deserialize, Serialize};
use std::fmt;

sol! {
    /// A tip from one user to another, with the platform fee split.
    #[derive(Debug, PartialEq, Eq)]
    struct TipEventData {
        uint64 id;
        address fromAddress;
        address toAddress;
        string fromUsername;
        string toUsername;
        uint256 amount;
        uint256 platformFee;
        uint256 recipientAmount;
        string message;
        uint64 timestamp;
        bytes32 txHash;
    }

    /// Account registration.
    #[derive(Debug, PartialEq, Eq)]
    struct ProfileCreatedData {
        address userAddress;
        string username;
        uint256 creditScore;
        uint64 timestamp;
        bytes32 txHash;
    }

    /// Display name or avatar change.
    #[derive(Debug, PartialEq, Eq)]
    struct ProfileUpdatedData {
        address userAddress;
        string username;
        string profileImageRef;
        uint64 timestamp;
        bytes32 txHash;
    }

    /// Running per-user tip totals.
    #[derive(Debug, PartialEq, Eq)]
    struct LeaderboardUpdateData {
        address userAddress;
        string username;
        uint256 totalReceived;
        uint256 totalSent;
        uint64 tipsReceived;
        uint64 tipsSent;
        uint64 timestamp;
    }
}

/// Schema string of the tip event stream.
pub const TIP_EVENT_SCHEMA: &str = "uint64 id, address fromAddress, address toAddress, \
     string fromUsername, string toUsername, uint256 amount, uint256 platformFee, \
     uint256 recipientAmount, string message, uint64 timestamp, bytes32 txHash";

/// Schema string of the profile-created stream.
pub const PROFILE_CREATED_SCHEMA: &str =
    "address userAddress, string username, uint256 creditScore, uint64 timestamp, bytes32 txHash";

/// Schema string of the profile-updated stream.
pub const PROFILE_UPDATED_SCHEMA: &str = "address userAddress, string username, \
     string profileImageRef, uint64 timestamp, bytes32 txHash";

/// Schema string of the leaderboard-update stream.
pub const LEADERBOARD_UPDATE_SCHEMA: &str = "address userAddress, string username, \
     uint256 totalReceived, uint256 totalSent, uint64 tipsReceived, uint64 tipsSent, \
     uint64 timestamp";

/// Tag of a normalized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Tip,
    ProfileCreated,
    ProfileUpdated,
    LeaderboardUpdate,
}

impl RecordKind {
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Tip,
        RecordKind::ProfileCreated,
        RecordKind::ProfileUpdated,
        RecordKind::LeaderboardUpdate,
    ];

    /// Stable label used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Tip => "tip",
            RecordKind::ProfileCreated => "profile_created",
            RecordKind::ProfileUpdated => "profile_updated",
            RecordKind::LeaderboardUpdate => "leaderboard_update",
        }
    }

    /// Canonical wire schema string for this tag.
    pub fn schema(&self) -> &'static str {
        match self {
            RecordKind::Tip => TIP_EVENT_SCHEMA,
            RecordKind::ProfileCreated => PROFILE_CREATED_SCHEMA,
            RecordKind::ProfileUpdated => PROFILE_UPDATED_SCHEMA,
            RecordKind::LeaderboardUpdate => LEADERBOARD_UPDATE_SCHEMA,
        }
    }

    /// Dense index for per-kind counter arrays.
    pub(crate) fn index(&self) -> usize {
        match self {
            RecordKind::Tip => 0,
            RecordKind::ProfileCreated => 1,
            RecordKind::ProfileUpdated => 2,
            RecordKind::LeaderboardUpdate => 3,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record in one of the four wire schemas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedRecord {
    Tip(TipEventData),
    ProfileCreated(ProfileCreatedData),
    ProfileUpdated(ProfileUpdatedData),
    LeaderboardUpdate(LeaderboardUpdateData),
}

impl NormalizedRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            NormalizedRecord::Tip(_) => RecordKind::Tip,
            NormalizedRecord::ProfileCreated(_) => RecordKind::ProfileCreated,
            NormalizedRecord::ProfileUpdated(_) => RecordKind::ProfileUpdated,
            NormalizedRecord::LeaderboardUpdate(_) => RecordKind::LeaderboardUpdate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_names(schema: &str) -> Vec<&str> {
        schema
            .split(',')
            .map(|f| f.split_whitespace().last().unwrap())
            .collect()
    }

    #[test]
    fn test_schema_field_order() {
        assert_eq!(
            field_names(TIP_EVENT_SCHEMA),
            [
                "id",
                "fromAddress",
                "toAddress",
                "fromUsername",
                "toUsername",
                "amount",
                "platformFee",
                "recipientAmount",
                "message",
                "timestamp",
                "txHash"
            ]
        );
        assert_eq!(
            field_names(PROFILE_CREATED_SCHEMA),
            ["userAddress", "username", "creditScore", "timestamp", "txHash"]
        );
        assert_eq!(
            field_names(PROFILE_UPDATED_SCHEMA),
            ["userAddress", "username", "profileImageRef", "timestamp", "txHash"]
        );
    }

    #[test]
    fn test_kind_labels_unique() {
        let labels: std::collections::HashSet<_> =
            RecordKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(labels.len(), RecordKind::ALL.len());
        for (i, kind) in RecordKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }
}
