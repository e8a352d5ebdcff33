//! Classification of raw data blocks into typed records.
//!
//! The block type tag selects the record variant. Tags this decoder does not
//! know are passed through as [`Record::Unknown`] so newer files still scan.

use crate::types::{
    AdBlockRecord, BlockAnomaly, BlockType, EventRecord, RawBlock, Record, SpikeRecord,
    STROBED_EVENT_CHANNEL,
};
use log::{debug, warn};

/// Converts a raw block into its typed record.
pub fn classify(block: RawBlock) -> Record {
    match BlockType::from_i16(block.header.block_type) {
        Some(BlockType::Spike) => Record::Spike(decode_spike(block)),
        Some(BlockType::Event) => Record::Event(decode_event(&block)),
        Some(BlockType::Continuous) => Record::Continuous(decode_continuous(block)),
        None => {
            debug!(
                "passing through block with unknown type {} at offset {}",
                block.header.block_type, block.offset
            );
            Record::Unknown(block)
        }
    }
}

fn decode_spike(block: RawBlock) -> SpikeRecord {
    let h = block.header;
    let waveform = if h.waveform_count > 0 && !block.samples.is_empty() {
        Some(block.samples)
    } else {
        None
    };
    SpikeRecord {
        timestamp: h.timestamp(),
        channel: h.channel,
        unit: h.unit,
        waveform,
    }
}

fn decode_event(block: &RawBlock) -> EventRecord {
    let h = block.header;
    if h.channel == STROBED_EVENT_CHANNEL {
        return EventRecord {
            timestamp: h.timestamp(),
            channel: h.channel,
            unit: h.unit,
            strobed_value: Some(h.unit as u16),
        };
    }

    if h.unit != 0 {
        warn!(
            "event on channel {} at offset {} has unit {}; recorded as 0",
            h.channel, block.offset, h.unit
        );
    }
    EventRecord {
        timestamp: h.timestamp(),
        channel: h.channel,
        unit: 0,
        strobed_value: None,
    }
}

fn decode_continuous(block: RawBlock) -> AdBlockRecord {
    let h = block.header;
    let anomaly = if h.waveform_count != 1 {
        warn!(
            "continuous block on channel {} at offset {} has {} waveforms, expected 1",
            h.channel, block.offset, h.waveform_count
        );
        Some(BlockAnomaly::UnexpectedWaveformCount(h.waveform_count))
    } else {
        None
    };
    AdBlockRecord {
        timestamp: h.timestamp(),
        channel: h.channel,
        samples: block.samples,
        anomaly,
    }
}
