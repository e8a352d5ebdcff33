//! PLX decoder library for Plexon electrophysiology recordings.
//!
//! A PLX file holds a fixed global header, three channel description tables
//! and a forward-only stream of self-delimiting data blocks: spike
//! timestamps with optional waveforms, digital events, and runs of
//! continuous A/D samples.
//!
//! # Example
//!
//! ```no_run
//! use plx_core::PlxReader;
//!
//! let mut reader = PlxReader::open("session.plx").unwrap();
//! println!("Master clock: {} Hz", reader.header().ad_frequency);
//!
//! for spike in reader.select_spikes(1, 1).unwrap() {
//!     let spike = spike.unwrap();
//!     println!("spike at {} ticks", spike.timestamp);
//! }
//!
//! for sample in reader.select_continuous(0).unwrap() {
//!     let sample = sample.unwrap();
//!     println!("{} ticks: {:.4} V", sample.timestamp, sample.voltage);
//! }
//! ```
//!
//! # Features
//!
//! - Field-by-field little-endian decoding, independent of struct layout
//! - 40-bit unsigned tick timestamps
//! - Lazy, restartable block stream that stops cleanly on a cut-off block
//! - Calibrated voltages and reconstructed per-sample continuous timestamps
//! - Single-pass multiplexed extraction and an optional in-memory index

pub mod channels;
pub mod convert;
pub mod decoder;
pub mod error;
pub mod header;
pub mod index;
pub mod parser;
pub mod query;
pub mod reader;
pub mod stream;
pub mod types;

#[cfg(test)]
#[path = "../tests/common/mod.rs"]
mod fixtures;

// Re-export commonly used types
pub use channels::{ChannelTables, DspChannelHeader, EventChannelHeader, SlowChannelHeader};
pub use error::{ChannelKind, PlxError, Result};
pub use header::FileHeader;
pub use index::RecordIndex;
pub use query::{Extraction, ExtractionPlan};
pub use reader::PlxReader;
pub use stream::BlockStream;
pub use types::{
    AdBlockRecord, ContinuousCalibration, ContinuousSample, EventRecord, ReadOptions, Record,
    SpikeRecord,
};
