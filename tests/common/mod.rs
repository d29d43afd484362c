//! Shared doubles for the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use tip_relay::clock::Clock;
use tip_relay::config::QueueConfig;
use tip_relay::events::{
    ContractAddresses, EventFeed, EventFilter, EventKind, FeedError, LogMeta, RawEvent,
    RawProfileCreated, RawProfileUpdated, RawTipSent, Subscription,
};
use tip_relay::leaderboard::LeaderboardTally;
use tip_relay::relay::{Relay, RelayDeps};
use tip_relay::schema::StreamPayload;
use tip_relay::stream::{SinkError, StreamSink};

/// In-memory chain client. Events are pushed with `emit`.
pub struct FakeFeed {
    pub connected: AtomicBool,
    pub subscribe_calls: AtomicUsize,
    /// Delay inside `check_connection`, to widen start races.
    pub connect_delay: Duration,
    senders: Mutex<Vec<(EventKind, mpsc::Sender<RawEvent>)>>,
}

impl FakeFeed {
    pub fn connected() -> Arc<Self> {
        Arc::new(Self::with_state(true, Duration::ZERO))
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(Self::with_state(false, Duration::ZERO))
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self::with_state(true, delay))
    }

    fn with_state(connected: bool, connect_delay: Duration) -> Self {
        Self {
            connected: AtomicBool::new(connected),
            subscribe_calls: AtomicUsize::new(0),
            connect_delay,
            senders: Mutex::new(Vec::new()),
        }
    }

    /// Deliver an event through the subscription for its kind.
    pub async fn emit(&self, event: RawEvent) {
        let sender = {
            let senders = self.senders.lock().unwrap();
            senders
                .iter()
                .find(|(kind, _)| *kind == event.kind())
                .map(|(_, tx)| tx.clone())
                .expect("no subscription for event kind")
        };
        sender.send(event).await.expect("event channel closed");
    }
}

#[async_trait]
impl EventFeed for FakeFeed {
    async fn check_connection(&self) -> Result<(), FeedError> {
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(FeedError::Unavailable("no provider".into()))
        }
    }

    async fn subscribe(
        &self,
        filter: EventFilter,
        events: mpsc::Sender<RawEvent>,
    ) -> Result<Subscription, FeedError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let mut senders = self.senders.lock().unwrap();
        senders.retain(|(kind, tx)| *kind != filter.kind && !tx.is_closed());
        senders.push((filter.kind, events));
        Ok(Subscription::passive(filter.kind))
    }
}

/// Stream sink with a programmable failure pattern.
#[derive(Default)]
pub struct ScriptedSink {
    /// Outcomes consumed first, one per call.
    script: Mutex<VecDeque<Result<(), SinkError>>>,
    /// Fail every call once the script is exhausted.
    pub always_fail: AtomicBool,
    pub calls: AtomicU32,
    pub accepted: Mutex<Vec<StreamPayload>>,
}

impl ScriptedSink {
    pub fn healthy() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let sink = Self::default();
        sink.always_fail.store(true, Ordering::SeqCst);
        Arc::new(sink)
    }

    pub fn scripted(outcomes: Vec<Result<(), SinkError>>) -> Arc<Self> {
        let sink = Self::default();
        *sink.script.lock().unwrap() = outcomes.into();
        Arc::new(sink)
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.lock().unwrap().len()
    }
}

#[async_trait]
impl StreamSink for ScriptedSink {
    async fn append(&self, payload: &StreamPayload) -> Result<(), SinkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.script.lock().unwrap().pop_front();
        let outcome = outcome.unwrap_or_else(|| {
            if self.always_fail.load(Ordering::SeqCst) {
                Err(SinkError::Transient("stream unavailable".into()))
            } else {
                Ok(())
            }
        });
        if outcome.is_ok() {
            self.accepted.lock().unwrap().push(payload.clone());
        }
        outcome
    }
}

pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.0
    }
}

/// Queue settings tuned for tests: no retry delay, long poll interval so
/// only explicit `retry_queue` calls drain unless a test says otherwise.
pub fn test_config(max_cache_size: usize) -> QueueConfig {
    QueueConfig {
        poll_interval_ms: 60_000,
        max_cache_size,
        batch_size: 10,
        auto_retry: true,
        max_retries: 3,
        retry_delay_ms: 0,
        publish_timeout_ms: 500,
        channel_capacity: 64,
    }
}

pub fn build_relay(
    config: &QueueConfig,
    feed: Arc<FakeFeed>,
    sink: Arc<ScriptedSink>,
    leaderboard: Option<LeaderboardTally>,
) -> Relay {
    Relay::new(
        config,
        ContractAddresses {
            tip_contract: Address::repeat_byte(0xA1),
            profile_contract: Address::repeat_byte(0xB2),
        },
        RelayDeps {
            feed,
            sink,
            clock: Arc::new(FixedClock(1_700_000_000_000)),
            leaderboard,
        },
    )
}

fn meta(n: u64) -> LogMeta {
    let mut hash = [0u8; 32];
    hash[24..].copy_from_slice(&n.to_be_bytes());
    LogMeta {
        tx_hash: Some(Bytes::copy_from_slice(&hash)),
        block_timestamp: Some(1_700_000_000 + n),
        block_number: Some(100 + n),
    }
}

fn address(byte: u8) -> Bytes {
    Bytes::copy_from_slice(Address::repeat_byte(byte).as_slice())
}

pub fn tip_event(id: u64) -> RawEvent {
    RawEvent::TipSent(RawTipSent {
        tip_id: U256::from(id),
        from: address(0x11),
        to: address(0x22),
        from_username: "alice".into(),
        to_username: "bob".into(),
        amount: U256::from(1_000_000u64),
        platform_fee: U256::from(25_000u64),
        recipient_amount: Some(U256::from(975_000u64)),
        message: format!("tip #{id}"),
        meta: meta(id),
    })
}

pub fn profile_created_event(n: u64) -> RawEvent {
    RawEvent::ProfileCreated(RawProfileCreated {
        user: address(n as u8),
        username: format!("user{n}"),
        credit_score: U256::from(600 + n),
        meta: meta(n),
    })
}

pub fn profile_updated_event(n: u64) -> RawEvent {
    RawEvent::ProfileUpdated(RawProfileUpdated {
        user: address(n as u8),
        username: format!("user{n}"),
        profile_image: format!("ipfs://avatar/{n}"),
        meta: meta(n),
    })
}

/// Poll `cond` until it holds or two seconds pass.
pub async fn wait_until<F: Fn() -> bool>(cond: F) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

/// A request captured by the programmable backend.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

/// Start a programmable HTTP backend on an ephemeral port.
///
/// `f` receives each parsed request and returns the status and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(CapturedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request(socket: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse().unwrap_or(0);
            } else if name.eq_ignore_ascii_case("authorization") {
                authorization = Some(value.to_string());
            }
        }
    }

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    Some(CapturedRequest {
        method,
        path,
        authorization,
        body,
    })
}
