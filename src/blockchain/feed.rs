//! Contract event feed backed by `eth_getLogs` polling.
//!
//! Each subscription runs its own poll task. A task starts at the head seen
//! when subscribing, trails the head by `confirmation_blocks`, and keeps
//! retrying through RPC errors until it is cancelled.
//!
//! Logs that fail ABI decoding never reach the relay, so they are absent from
//! `Relay::get_metrics`. They are counted on the exporter as
//! `relay_decode_errors_total{stage="abi"}`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Bytes, B256};
use alloy::rpc::types::{Filter, Log};
use alloy::sol;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::events::{
    EventFeed, EventFilter, EventKind, FeedError, LogMeta, RawEvent, RawProfileCreated,
    RawProfileUpdated, RawTipSent, Subscription,
};

sol! {
    /// Emitted by the tipping contract for every tip.
    #[derive(Debug)]
    event TipSent(
        uint256 indexed tipId,
        address indexed from,
        address indexed to,
        string fromUsername,
        string toUsername,
        uint256 amount,
        uint256 platformFee,
        uint256 recipientAmount,
        string message
    );

    /// Emitted by the profile contract on registration.
    #[derive(Debug)]
    event ProfileCreated(address indexed user, string username, uint256 creditScore);

    /// Emitted by the profile contract on a name or avatar change.
    #[derive(Debug)]
    event ProfileUpdated(address indexed user, string username, string profileImage);
}

fn signature_hash(kind: EventKind) -> B256 {
    match kind {
        EventKind::TipSent => TipSent::SIGNATURE_HASH,
        EventKind::ProfileCreated => ProfileCreated::SIGNATURE_HASH,
        EventKind::ProfileUpdated => ProfileUpdated::SIGNATURE_HASH,
    }
}

fn log_meta(log: &Log) -> LogMeta {
    LogMeta {
        tx_hash: log.transaction_hash.map(|h| Bytes::copy_from_slice(h.as_slice())),
        block_timestamp: log.block_timestamp,
        block_number: log.block_number,
    }
}

fn decode_error(kind: EventKind, e: impl std::fmt::Display) -> BlockchainError {
    BlockchainError::Decode {
        event: kind.as_str(),
        reason: e.to_string(),
    }
}

/// Decode one log into the raw event shape for `kind`.
pub fn decode_log(kind: EventKind, log: &Log) -> BlockchainResult<RawEvent> {
    let meta = log_meta(log);
    let event = match kind {
        EventKind::TipSent => {
            let e = log.log_decode::<TipSent>().map_err(|e| decode_error(kind, e))?.inner.data;
            RawEvent::TipSent(RawTipSent {
                tip_id: e.tipId,
                from: Bytes::copy_from_slice(e.from.as_slice()),
                to: Bytes::copy_from_slice(e.to.as_slice()),
                from_username: e.fromUsername,
                to_username: e.toUsername,
                amount: e.amount,
                platform_fee: e.platformFee,
                recipient_amount: Some(e.recipientAmount),
                message: e.message,
                meta,
            })
        }
        EventKind::ProfileCreated => {
            let e = log
                .log_decode::<ProfileCreated>()
                .map_err(|e| decode_error(kind, e))?
                .inner
                .data;
            RawEvent::ProfileCreated(RawProfileCreated {
                user: Bytes::copy_from_slice(e.user.as_slice()),
                username: e.username,
                credit_score: e.creditScore,
                meta,
            })
        }
        EventKind::ProfileUpdated => {
            let e = log
                .log_decode::<ProfileUpdated>()
                .map_err(|e| decode_error(kind, e))?
                .inner
                .data;
            RawEvent::ProfileUpdated(RawProfileUpdated {
                user: Bytes::copy_from_slice(e.user.as_slice()),
                username: e.username,
                profile_image: e.profileImage,
                meta,
            })
        }
    };
    Ok(event)
}

/// Decode a batch of logs, skipping and counting the ones that do not match
/// the ABI of `kind`.
pub fn decode_logs(kind: EventKind, logs: &[Log]) -> Vec<RawEvent> {
    let mut events = Vec::with_capacity(logs.len());
    for log in logs {
        match decode_log(kind, log) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::warn!(error = %e, tx = ?log.transaction_hash, "Skipping undecodable log");
                metrics::counter!(
                    "relay_decode_errors_total",
                    "event" => kind.as_str(),
                    "stage" => "abi"
                )
                .increment(1);
            }
        }
    }
    events
}

/// `EventFeed` over a polling JSON-RPC client.
#[derive(Debug, Clone)]
pub struct AlloyEventFeed {
    client: Arc<BlockchainClient>,
    poll_interval: Duration,
}

impl AlloyEventFeed {
    pub fn new(client: Arc<BlockchainClient>) -> Self {
        let poll_interval = Duration::from_millis(client.config().log_poll_interval_ms.max(1));
        Self {
            client,
            poll_interval,
        }
    }
}

#[async_trait]
impl EventFeed for AlloyEventFeed {
    async fn check_connection(&self) -> Result<(), FeedError> {
        self.client
            .get_block_number()
            .await
            .map(|_| ())
            .map_err(|e| FeedError::Unavailable(e.to_string()))
    }

    async fn subscribe(
        &self,
        filter: EventFilter,
        events: mpsc::Sender<RawEvent>,
    ) -> Result<Subscription, FeedError> {
        let head = self
            .client
            .get_block_number()
            .await
            .map_err(|e| FeedError::Unavailable(e.to_string()))?;
        let confirmations = u64::from(self.client.confirmation_blocks());

        let poller = LogPoller {
            client: self.client.clone(),
            filter,
            confirmations,
            last_block: head.saturating_sub(confirmations),
        };
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(poller.run(self.poll_interval, events, cancel_rx));

        tracing::info!(
            event = %filter.kind,
            contract = %filter.contract,
            from_block = head,
            "Watching contract logs"
        );
        Ok(Subscription::new(filter.kind, cancel_tx, task))
    }
}

/// Feed used when the chain integration is switched off. Starting the relay
/// against it reports a connection error.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledFeed;

#[async_trait]
impl EventFeed for DisabledFeed {
    async fn check_connection(&self) -> Result<(), FeedError> {
        Err(FeedError::Unavailable("blockchain integration disabled".into()))
    }

    async fn subscribe(
        &self,
        _filter: EventFilter,
        _events: mpsc::Sender<RawEvent>,
    ) -> Result<Subscription, FeedError> {
        Err(FeedError::Unavailable("blockchain integration disabled".into()))
    }
}

struct LogPoller {
    client: Arc<BlockchainClient>,
    filter: EventFilter,
    confirmations: u64,
    /// Highest block already scanned.
    last_block: u64,
}

impl LogPoller {
    async fn run(
        mut self,
        interval: Duration,
        events: mpsc::Sender<RawEvent>,
        mut cancel: oneshot::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = &mut cancel => break,
                _ = tokio::time::sleep(interval) => {}
            }
            match self.poll(&events).await {
                Ok(true) => {}
                // Receiver gone: the session is over.
                Ok(false) => break,
                Err(e) => tracing::warn!(event = %self.filter.kind, error = %e, "Log poll failed"),
            }
        }
        tracing::debug!(event = %self.filter.kind, "Log poller exiting");
    }

    /// Returns `false` once the event channel is closed.
    async fn poll(&mut self, events: &mpsc::Sender<RawEvent>) -> BlockchainResult<bool> {
        let head = self.client.get_block_number().await?;
        let target = head.saturating_sub(self.confirmations);
        if target <= self.last_block {
            return Ok(true);
        }

        let query = Filter::new()
            .address(self.filter.contract)
            .event_signature(signature_hash(self.filter.kind))
            .from_block(self.last_block + 1)
            .to_block(target);
        let logs = self.client.get_logs(&query).await?;

        let mut timestamps: HashMap<u64, Option<u64>> = HashMap::new();
        for mut event in decode_logs(self.filter.kind, &logs) {
            self.fill_timestamp(&mut event, &mut timestamps).await?;
            if events.send(event).await.is_err() {
                return Ok(false);
            }
        }

        self.last_block = target;
        Ok(true)
    }

    /// Many nodes omit `blockTimestamp` on logs; look the block up instead.
    async fn fill_timestamp(
        &self,
        event: &mut RawEvent,
        cache: &mut HashMap<u64, Option<u64>>,
    ) -> BlockchainResult<()> {
        let meta = match event {
            RawEvent::TipSent(e) => &mut e.meta,
            RawEvent::ProfileCreated(e) => &mut e.meta,
            RawEvent::ProfileUpdated(e) => &mut e.meta,
        };
        if meta.block_timestamp.is_some() {
            return Ok(());
        }
        let Some(number) = meta.block_number else {
            return Ok(());
        };
        let timestamp = match cache.get(&number) {
            Some(ts) => *ts,
            None => {
                let ts = self.client.get_block_timestamp(number).await?;
                cache.insert(number, ts);
                ts
            }
        };
        meta.block_timestamp = timestamp;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};

    fn rpc_log<E: SolEvent>(event: &E) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: Address::repeat_byte(0xAA),
                data: event.encode_log_data(),
            },
            block_number: Some(12),
            block_timestamp: Some(1_700_000_000),
            transaction_hash: Some(B256::repeat_byte(0x07)),
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_tip_log() {
        let log = rpc_log(&TipSent {
            tipId: U256::from(4),
            from: Address::repeat_byte(1),
            to: Address::repeat_byte(2),
            fromUsername: "alice".into(),
            toUsername: "bob".into(),
            amount: U256::from(1_000),
            platformFee: U256::from(25),
            recipientAmount: U256::from(975),
            message: "thanks".into(),
        });

        let RawEvent::TipSent(tip) = decode_log(EventKind::TipSent, &log).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(tip.tip_id, U256::from(4));
        assert_eq!(tip.from.as_ref(), Address::repeat_byte(1).as_slice());
        assert_eq!(tip.recipient_amount, Some(U256::from(975)));
        assert_eq!(tip.meta.block_timestamp, Some(1_700_000_000));
        assert_eq!(tip.meta.tx_hash.unwrap().len(), 32);
    }

    #[test]
    fn test_decode_profile_logs() {
        let created = rpc_log(&ProfileCreated {
            user: Address::repeat_byte(3),
            username: "carol".into(),
            creditScore: U256::from(700),
        });
        assert!(matches!(
            decode_log(EventKind::ProfileCreated, &created),
            Ok(RawEvent::ProfileCreated(p)) if p.username == "carol"
        ));

        let updated = rpc_log(&ProfileUpdated {
            user: Address::repeat_byte(3),
            username: "carol".into(),
            profileImage: "ipfs://c".into(),
        });
        assert!(matches!(
            decode_log(EventKind::ProfileUpdated, &updated),
            Ok(RawEvent::ProfileUpdated(p)) if p.profile_image == "ipfs://c"
        ));
    }

    #[test]
    fn test_wrong_event_is_decode_error() {
        let log = rpc_log(&ProfileCreated {
            user: Address::ZERO,
            username: String::new(),
            creditScore: U256::ZERO,
        });
        let err = decode_log(EventKind::TipSent, &log).unwrap_err();
        assert!(matches!(err, BlockchainError::Decode { event: "tip_sent", .. }));
    }

    #[test]
    fn test_decode_logs_skips_mismatched() {
        let good = rpc_log(&ProfileCreated {
            user: Address::repeat_byte(5),
            username: "dave".into(),
            creditScore: U256::from(650),
        });
        let bad = rpc_log(&ProfileUpdated {
            user: Address::repeat_byte(5),
            username: "dave".into(),
            profileImage: "ipfs://d".into(),
        });

        let events = decode_logs(EventKind::ProfileCreated, &[bad, good]);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], RawEvent::ProfileCreated(p) if p.username == "dave"));
    }

    #[test]
    fn test_signatures_distinct() {
        assert_ne!(
            signature_hash(EventKind::ProfileCreated),
            signature_hash(EventKind::ProfileUpdated)
        );
    }
}
