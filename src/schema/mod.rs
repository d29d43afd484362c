//! Wire schemas accepted by the streaming service.
//!
//! # Data Flow
//! ```text
//! NormalizedRecord (records.rs)
//!     → encoder.rs (ABI tuple, schema id, data id)
//!     → StreamPayload
//!     → stream sink
//! ```

pub mod encoder;
pub mod records;

pub use encoder::{schema_id, SchemaEncoder, SchemaError, StreamPayload};
pub use records::{
    LeaderboardUpdateData, NormalizedRecord, ProfileCreatedData, ProfileUpdatedData, RecordKind,
    TipEventData,
};
