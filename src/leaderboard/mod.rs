//! Per-user tip totals derived from published tips.
//!
//! # Data Flow
//! ```text
//! drain loop: tip published
//!     → LeaderboardTally::record_tip
//!     → LeaderboardUpdate records (sender, recipient)
//!     → PublishQueue::enqueue
//! ```

pub mod tally;

pub use tally::{LeaderboardTally, Standing};
