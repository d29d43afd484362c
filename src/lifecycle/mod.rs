//! Process lifecycle helpers.
//!
//! # Data Flow
//! ```text
//! Relay session (relay::controller):
//!     start() → Shutdown per session → drain loop + ingest task subscribe
//!     stop()  → Shutdown::trigger → tasks finish current work → joined
//!
//! Binary (signals.rs):
//!     SIGTERM/SIGINT → Relay::stop → exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
