//! Global PLX file header.
//!
//! The header is a fixed 7504-byte record at offset 0. Besides the channel
//! counts needed to locate the data section it carries per-channel count
//! tables written by the recording software. Those tables are informational
//! only; the block stream is the ground truth.

use crate::error::{PlxError, Result};
use crate::parser::{read_up_to, FieldReader};
use crate::types::{
    ReadOptions, DSP_CHANNEL_HEADER_SIZE, EVENT_CHANNEL_HEADER_SIZE, EVENT_COUNT_SLOTS,
    FILE_HEADER_SIZE, MAX_COUNT_CHANNELS, MAX_COUNT_UNITS, PLX_MAGIC, SLOW_CHANNEL_HEADER_SIZE,
    SLOW_COUNT_OFFSET,
};
use log::debug;
use std::io::Read;

/// Date and time the recording was created, as stored in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreationTime {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
}

/// The decoded global header.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    pub magic: u32,
    /// File format version
    pub version: i32,
    pub comment: String,
    /// Master tick frequency in Hz
    pub ad_frequency: i32,
    pub num_dsp_channels: i32,
    pub num_event_channels: i32,
    pub num_slow_channels: i32,
    /// Samples per spike waveform
    pub num_points_wave: i32,
    /// Samples before the threshold crossing
    pub num_points_pre_threshold: i32,
    pub created: CreationTime,
    pub fast_read: i32,
    pub waveform_frequency: i32,
    /// Timestamp of the last block in ticks, as recorded by the writer
    pub last_timestamp: f64,
    pub trodalness: u8,
    pub data_trodalness: u8,
    pub bits_per_spike_sample: u8,
    pub bits_per_slow_sample: u8,
    pub spike_max_magnitude_mv: u16,
    pub slow_max_magnitude_mv: u16,
    pub spike_pre_amp_gain: u16,
    pub acquiring_software: String,
    pub processing_software: String,
    /// Spike counts indexed `[channel][unit]`
    pub ts_counts: Vec<[i32; MAX_COUNT_UNITS]>,
    /// Waveform counts indexed `[channel][unit]`
    pub wf_counts: Vec<[i32; MAX_COUNT_UNITS]>,
    /// Event counts; slots from 300 on hold analog sample counts
    pub ev_counts: Vec<i32>,
}

impl FileHeader {
    /// Decodes the header from the first [`FILE_HEADER_SIZE`] bytes of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FILE_HEADER_SIZE {
            return Err(PlxError::Truncated {
                what: "file header",
                needed: FILE_HEADER_SIZE as u64,
                available: bytes.len() as u64,
            });
        }

        let mut r = FieldReader::new(&bytes[..FILE_HEADER_SIZE]);
        let magic = r.u32();
        if magic != PLX_MAGIC {
            return Err(PlxError::InvalidFormat(format!(
                "bad magic number {:#010x}, expected {:#010x}",
                magic, PLX_MAGIC
            )));
        }

        let version = r.i32();
        let comment = r.fixed_str(128);
        let ad_frequency = r.i32();
        let num_dsp_channels = r.i32();
        let num_event_channels = r.i32();
        let num_slow_channels = r.i32();
        let num_points_wave = r.i32();
        let num_points_pre_threshold = r.i32();
        let created = CreationTime {
            year: r.i32(),
            month: r.i32(),
            day: r.i32(),
            hour: r.i32(),
            minute: r.i32(),
            second: r.i32(),
        };
        let fast_read = r.i32();
        let waveform_frequency = r.i32();
        let last_timestamp = r.f64();
        let trodalness = r.u8();
        let data_trodalness = r.u8();
        let bits_per_spike_sample = r.u8();
        let bits_per_slow_sample = r.u8();
        let spike_max_magnitude_mv = r.u16();
        let slow_max_magnitude_mv = r.u16();
        let spike_pre_amp_gain = r.u16();
        let acquiring_software = r.fixed_str(18);
        let processing_software = r.fixed_str(18);
        r.skip(10);

        let ts_counts = (0..MAX_COUNT_CHANNELS)
            .map(|_| r.i32_array::<MAX_COUNT_UNITS>())
            .collect();
        let wf_counts = (0..MAX_COUNT_CHANNELS)
            .map(|_| r.i32_array::<MAX_COUNT_UNITS>())
            .collect();
        let ev_counts = r.i32_array::<EVENT_COUNT_SLOTS>().to_vec();
        debug_assert_eq!(r.position(), FILE_HEADER_SIZE);

        Ok(Self {
            magic,
            version,
            comment,
            ad_frequency,
            num_dsp_channels,
            num_event_channels,
            num_slow_channels,
            num_points_wave,
            num_points_pre_threshold,
            created,
            fast_read,
            waveform_frequency,
            last_timestamp,
            trodalness,
            data_trodalness,
            bits_per_spike_sample,
            bits_per_slow_sample,
            spike_max_magnitude_mv,
            slow_max_magnitude_mv,
            spike_pre_amp_gain,
            acquiring_software,
            processing_software,
            ts_counts,
            wf_counts,
            ev_counts,
        })
    }

    /// Reads and decodes the header from the current position of `reader`.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = vec![0u8; FILE_HEADER_SIZE];
        let n = read_up_to(reader, &mut buf).map_err(|e| PlxError::io(0, e))?;
        let header = Self::parse(&buf[..n])?;
        debug!(
            "PLX header: version {}, {} Hz, {} DSP / {} event / {} slow channels",
            header.version,
            header.ad_frequency,
            header.num_dsp_channels,
            header.num_event_channels,
            header.num_slow_channels
        );
        Ok(header)
    }

    /// Checks the declared channel counts against `options`.
    pub fn validate(&self, options: &ReadOptions) -> Result<()> {
        check_count("DSP", self.num_dsp_channels, options.max_dsp_channels)?;
        check_count("event", self.num_event_channels, options.max_event_channels)?;
        check_count("slow", self.num_slow_channels, options.max_slow_channels)?;
        Ok(())
    }

    pub fn dsp_channel_count(&self) -> usize {
        self.num_dsp_channels.max(0) as usize
    }

    pub fn event_channel_count(&self) -> usize {
        self.num_event_channels.max(0) as usize
    }

    pub fn slow_channel_count(&self) -> usize {
        self.num_slow_channels.max(0) as usize
    }

    /// Total size of the three channel tables in bytes.
    pub fn channel_tables_size(&self) -> u64 {
        self.dsp_channel_count() as u64 * DSP_CHANNEL_HEADER_SIZE as u64
            + self.event_channel_count() as u64 * EVENT_CHANNEL_HEADER_SIZE as u64
            + self.slow_channel_count() as u64 * SLOW_CHANNEL_HEADER_SIZE as u64
    }

    /// Byte offset of the first data block.
    pub fn data_start_offset(&self) -> u64 {
        FILE_HEADER_SIZE as u64 + self.channel_tables_size()
    }

    /// Spike count recorded for `(channel, unit)`, if in table range.
    pub fn spike_count(&self, channel: usize, unit: usize) -> Option<i32> {
        self.ts_counts.get(channel)?.get(unit).copied()
    }

    /// Waveform count recorded for `(channel, unit)`, if in table range.
    pub fn waveform_count(&self, channel: usize, unit: usize) -> Option<i32> {
        self.wf_counts.get(channel)?.get(unit).copied()
    }

    /// Event count recorded for an event channel.
    pub fn event_count(&self, channel: usize) -> Option<i32> {
        if channel >= SLOW_COUNT_OFFSET {
            return None;
        }
        self.ev_counts.get(channel).copied()
    }

    /// Sample count recorded for a 0-based analog channel.
    pub fn continuous_sample_count(&self, ad_channel: usize) -> Option<i32> {
        self.ev_counts.get(SLOW_COUNT_OFFSET + ad_channel).copied()
    }

    /// Recording length in seconds according to the header.
    pub fn duration_seconds(&self) -> Option<f64> {
        if self.ad_frequency <= 0 {
            return None;
        }
        Some(self.last_timestamp / self.ad_frequency as f64)
    }
}

fn check_count(kind: &str, declared: i32, max: usize) -> Result<()> {
    if declared < 0 || declared as usize > max {
        return Err(PlxError::InvalidFormat(format!(
            "{} channel count {} outside 0..={}",
            kind, declared, max
        )));
    }
    Ok(())
}
