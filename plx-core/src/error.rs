//! Error types for PLX decoding.

use std::fmt;
use thiserror::Error;

/// Which of the three channel tables a lookup was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Dsp,
    Event,
    Slow,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dsp => f.write_str("DSP"),
            Self::Event => f.write_str("event"),
            Self::Slow => f.write_str("slow"),
        }
    }
}

/// Errors that can occur while decoding a PLX file.
#[derive(Error, Debug)]
pub enum PlxError {
    #[error("IO error at byte offset {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// Not enough bytes for the file header or the channel tables.
    #[error("Truncated {what}: needed {needed} bytes, {available} available")]
    Truncated {
        what: &'static str,
        needed: u64,
        available: u64,
    },

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    /// The stream ended inside a data block. Only the current pass is
    /// terminated; blocks yielded before it remain valid.
    #[error("Truncated data block at byte offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedBlock {
        offset: u64,
        needed: u64,
        available: u64,
    },

    #[error("Unknown {kind} channel {channel}")]
    UnknownChannel { kind: ChannelKind, channel: i32 },

    /// Zero gain or zero sampling rate for a requested conversion.
    #[error("Missing calibration: {0}")]
    MissingCalibration(String),
}

impl PlxError {
    pub(crate) fn io(offset: u64, source: std::io::Error) -> Self {
        Self::Io { offset, source }
    }

    /// Returns true for the error that ends a scan without invalidating
    /// earlier records.
    pub fn is_truncated_block(&self) -> bool {
        matches!(self, Self::TruncatedBlock { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PlxError>;
