//! Concurrent running totals keyed by address.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use serde::Serialize;

use crate::schema::{LeaderboardUpdateData, TipEventData};

/// One user's running totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub username: String,
    pub total_received: U256,
    pub total_sent: U256,
    pub tips_received: u64,
    pub tips_sent: u64,
}

impl Standing {
    fn to_update(&self, user: Address, timestamp: u64) -> LeaderboardUpdateData {
        LeaderboardUpdateData {
            userAddress: user,
            username: self.username.clone(),
            totalReceived: self.total_received,
            totalSent: self.total_sent,
            tipsReceived: self.tips_received,
            tipsSent: self.tips_sent,
            timestamp,
        }
    }
}

/// Thread-safe tally shared between the drain loop and readers.
#[derive(Debug, Clone, Default)]
pub struct LeaderboardTally {
    inner: Arc<DashMap<Address, Standing>>,
}

impl LeaderboardTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a confirmed tip into both parties' totals.
    ///
    /// Returns the sender's update followed by the recipient's. A self-tip
    /// yields a single update carrying both sides.
    pub fn record_tip(&self, tip: &TipEventData) -> Vec<LeaderboardUpdateData> {
        {
            let mut sender = self.inner.entry(tip.fromAddress).or_default();
            sender.username = tip.fromUsername.clone();
            sender.total_sent = sender.total_sent.saturating_add(tip.amount);
            sender.tips_sent += 1;
        }
        {
            let mut recipient = self.inner.entry(tip.toAddress).or_default();
            recipient.username = tip.toUsername.clone();
            recipient.total_received = recipient.total_received.saturating_add(tip.recipientAmount);
            recipient.tips_received += 1;
        }

        let mut users = vec![tip.fromAddress];
        if tip.toAddress != tip.fromAddress {
            users.push(tip.toAddress);
        }
        users
            .into_iter()
            .filter_map(|user| {
                self.inner
                    .get(&user)
                    .map(|standing| standing.to_update(user, tip.timestamp))
            })
            .collect()
    }

    pub fn get(&self, user: &Address) -> Option<Standing> {
        self.inner.get(user).map(|s| s.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Top `limit` users by total received.
    pub fn top(&self, limit: usize) -> Vec<(Address, Standing)> {
        let mut all: Vec<(Address, Standing)> = self
            .inner
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        all.sort_by(|a, b| b.1.total_received.cmp(&a.1.total_received));
        all.truncate(limit);
        all
    }
}
