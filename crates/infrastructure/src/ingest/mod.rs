//! Client side of the telemetry ingest protocol.

pub mod frame;
mod muxer;
mod spill;
pub mod tls;

pub use frame::{decode_entries, Entry, Handshake};
pub use muxer::IngestMuxer;
pub use spill::SpillCache;
