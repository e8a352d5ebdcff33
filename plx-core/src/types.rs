//! Core types for PLX data.
//!
//! This module defines the on-disk block header, the typed records produced
//! by the decoder, and the format constants from the Plexon PLX layout.

/// Magic number at offset 0 of every PLX file ("PLEX", little-endian).
pub const PLX_MAGIC: u32 = 0x5845_4C50;

/// Size of the fixed global file header in bytes.
pub const FILE_HEADER_SIZE: usize = 7504;
/// Size of one DSP (spike) channel header in bytes.
pub const DSP_CHANNEL_HEADER_SIZE: usize = 1020;
/// Size of one event channel header in bytes.
pub const EVENT_CHANNEL_HEADER_SIZE: usize = 296;
/// Size of one slow (analog) channel header in bytes.
pub const SLOW_CHANNEL_HEADER_SIZE: usize = 296;
/// Size of one data block header in bytes.
pub const DATA_BLOCK_HEADER_SIZE: usize = 16;

/// Rows in the per-(channel, unit) count tables.
pub const MAX_COUNT_CHANNELS: usize = 130;
/// Columns in the per-(channel, unit) count tables (unsorted + units a..d).
pub const MAX_COUNT_UNITS: usize = 5;
/// Length of the event count table.
pub const EVENT_COUNT_SLOTS: usize = 512;
/// First slot of the event count table that holds analog sample counts.
pub const SLOW_COUNT_OFFSET: usize = 300;

/// Event channel whose unit field carries a strobed digital word.
pub const STROBED_EVENT_CHANNEL: i16 = 257;
/// Event channel marking the start of a recording.
pub const START_EVENT_CHANNEL: i16 = 258;
/// Event channel marking the end of a recording.
pub const STOP_EVENT_CHANNEL: i16 = 259;
/// Event channel marking a recording pause.
pub const PAUSE_EVENT_CHANNEL: i16 = 260;
/// Event channel marking a recording resume.
pub const RESUME_EVENT_CHANNEL: i16 = 261;

/// Data block type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i16)]
pub enum BlockType {
    /// Single-electrode spike timestamp, optionally with waveform (1)
    Spike = 1,
    /// External digital event (4)
    Event = 4,
    /// Continuous A/D samples (5)
    Continuous = 5,
}

impl BlockType {
    /// Attempts to parse a block type from its on-disk tag.
    #[inline]
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(Self::Spike),
            4 => Some(Self::Event),
            5 => Some(Self::Continuous),
            _ => None,
        }
    }
}

/// The fixed 16-byte header preceding every data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBlockHeader {
    /// Raw type tag, see [`BlockType`]
    pub block_type: i16,
    /// Upper bits of the tick timestamp
    pub timestamp_high: u16,
    /// Lower 32 bits of the tick timestamp, always unsigned
    pub timestamp_low: u32,
    /// Channel number; meaning depends on the block type
    pub channel: i16,
    /// Unit number, or the strobed word on the strobed event channel
    pub unit: i16,
    /// Number of waveforms following the header
    pub waveform_count: i16,
    /// Number of 16-bit samples in each waveform
    pub words_per_waveform: i16,
}

impl DataBlockHeader {
    /// Full tick timestamp composed from the split on-disk fields.
    #[inline]
    pub fn timestamp(&self) -> u64 {
        ((self.timestamp_high as u64) << 32) | self.timestamp_low as u64
    }

    /// Number of 16-bit samples in the payload following this header.
    #[inline]
    pub fn payload_samples(&self) -> usize {
        if self.waveform_count <= 0 || self.words_per_waveform <= 0 {
            return 0;
        }
        self.waveform_count as usize * self.words_per_waveform as usize
    }

    /// Payload length in bytes.
    #[inline]
    pub fn payload_bytes(&self) -> usize {
        self.payload_samples() * 2
    }
}

/// A block as read from disk: header, payload and the byte offset it
/// started at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    pub offset: u64,
    pub header: DataBlockHeader,
    pub samples: Vec<i16>,
}

/// A spike timestamp on a DSP channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpikeRecord {
    /// Threshold crossing time in ticks
    pub timestamp: u64,
    /// 1-based DSP channel
    pub channel: i16,
    /// 0 = unsorted, 1..=4 = sorted units a..d
    pub unit: i16,
    /// Waveform samples, absent when the block carried none
    pub waveform: Option<Vec<i16>>,
}

/// Classification of an event channel number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Ordinary external event input
    External,
    Strobed,
    Start,
    Stop,
    Pause,
    Resume,
}

impl EventKind {
    pub fn from_channel(channel: i16) -> Self {
        match channel {
            STROBED_EVENT_CHANNEL => Self::Strobed,
            START_EVENT_CHANNEL => Self::Start,
            STOP_EVENT_CHANNEL => Self::Stop,
            PAUSE_EVENT_CHANNEL => Self::Pause,
            RESUME_EVENT_CHANNEL => Self::Resume,
            _ => Self::External,
        }
    }
}

/// A digital event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    /// Event time in ticks
    pub timestamp: u64,
    /// 1-based event channel
    pub channel: i16,
    /// Raw word on the strobed channel, 0 everywhere else
    pub unit: i16,
    /// Strobed word, present only on [`STROBED_EVENT_CHANNEL`]
    pub strobed_value: Option<u16>,
}

impl EventRecord {
    #[inline]
    pub fn kind(&self) -> EventKind {
        EventKind::from_channel(self.channel)
    }
}

/// Irregularities noticed while decoding a block that do not stop decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAnomaly {
    /// A continuous block carried a waveform count other than 1
    UnexpectedWaveformCount(i16),
}

/// A run of continuous samples on one analog channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdBlockRecord {
    /// Time of the first sample in ticks
    pub timestamp: u64,
    /// 0-based analog channel
    pub channel: i16,
    pub samples: Vec<i16>,
    pub anomaly: Option<BlockAnomaly>,
}

/// A decoded data block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Spike(SpikeRecord),
    Event(EventRecord),
    Continuous(AdBlockRecord),
    /// Unrecognized type tag, passed through untouched
    Unknown(RawBlock),
}

/// Record discriminant used for indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    Spike,
    Event,
    Continuous,
    Unknown,
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Spike(_) => RecordKind::Spike,
            Self::Event(_) => RecordKind::Event,
            Self::Continuous(_) => RecordKind::Continuous,
            Self::Unknown(_) => RecordKind::Unknown,
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            Self::Spike(r) => r.timestamp,
            Self::Event(r) => r.timestamp,
            Self::Continuous(r) => r.timestamp,
            Self::Unknown(raw) => raw.header.timestamp(),
        }
    }

    pub fn channel(&self) -> i16 {
        match self {
            Self::Spike(r) => r.channel,
            Self::Event(r) => r.channel,
            Self::Continuous(r) => r.channel,
            Self::Unknown(raw) => raw.header.channel,
        }
    }

    /// Unit used as the index key: the sorted unit for spikes, 0 otherwise.
    pub fn unit_key(&self) -> i16 {
        match self {
            Self::Spike(r) => r.unit,
            Self::Unknown(raw) => raw.header.unit,
            _ => 0,
        }
    }
}

/// A single calibrated continuous sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContinuousSample {
    /// Reconstructed sample time in ticks
    pub timestamp: u64,
    /// Sample value in volts
    pub voltage: f64,
}

/// Parameters needed to turn raw continuous samples into volts and ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuousCalibration {
    /// 0-based analog channel
    pub channel: i16,
    pub gain: i32,
    /// Channel sampling rate in Hz
    pub channel_frequency: i32,
    /// Master tick rate in Hz
    pub master_frequency: i32,
}

/// Options controlling how a file is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Upper bound for the declared DSP channel count
    pub max_dsp_channels: usize,
    /// Upper bound for the declared event channel count
    pub max_event_channels: usize,
    /// Upper bound for the declared slow channel count
    pub max_slow_channels: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_dsp_channels: 1024,
            max_event_channels: 1024,
            max_slow_channels: 1024,
        }
    }
}
