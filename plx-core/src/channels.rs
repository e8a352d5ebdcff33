//! Channel description tables.
//!
//! Three arrays follow the global header back to back: DSP (spike) channel
//! headers, event channel headers and slow (analog) channel headers. Each
//! array holds exactly the number of entries declared in the file header.
//! Array position is an ordinal, not a channel number; lookups go through
//! the channel field embedded in each entry.

use crate::error::{ChannelKind, PlxError, Result};
use crate::header::FileHeader;
use crate::parser::FieldReader;
use crate::types::{
    ContinuousCalibration, DSP_CHANNEL_HEADER_SIZE, EVENT_CHANNEL_HEADER_SIZE,
    FILE_HEADER_SIZE, SLOW_CHANNEL_HEADER_SIZE,
};
use std::io::Read;

/// Sort templates stored per unit.
pub const TEMPLATE_UNITS: usize = 5;
/// Samples per sort template.
pub const TEMPLATE_LENGTH: usize = 64;

const MAX_TABLE_PREALLOC: u64 = 256 * 1024;

/// Header of a spike (DSP) channel, including its sort parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DspChannelHeader {
    pub name: String,
    pub sig_name: String,
    /// 1-based DSP channel number
    pub channel: i32,
    pub wf_rate: i32,
    pub sig: i32,
    pub reference: i32,
    pub gain: i32,
    pub filter: i32,
    pub threshold: i32,
    /// Sorting method: 1 = boxes, 2 = templates
    pub method: i32,
    pub n_units: i32,
    pub templates: [[i16; TEMPLATE_LENGTH]; TEMPLATE_UNITS],
    pub fit: [i32; TEMPLATE_UNITS],
    pub sort_width: i32,
    /// Sort boxes indexed `[unit][box][corner]`
    pub boxes: [[[i16; 4]; 2]; TEMPLATE_UNITS],
    pub sort_begin: i32,
    pub comment: String,
    pub src_id: u8,
    pub chan_id: u16,
}

impl DspChannelHeader {
    fn parse(bytes: &[u8]) -> Self {
        let mut r = FieldReader::new(bytes);
        let name = r.fixed_str(32);
        let sig_name = r.fixed_str(32);
        let channel = r.i32();
        let wf_rate = r.i32();
        let sig = r.i32();
        let reference = r.i32();
        let gain = r.i32();
        let filter = r.i32();
        let threshold = r.i32();
        let method = r.i32();
        let n_units = r.i32();

        let mut templates = [[0i16; TEMPLATE_LENGTH]; TEMPLATE_UNITS];
        for template in templates.iter_mut() {
            *template = r.i16_array::<TEMPLATE_LENGTH>();
        }
        let fit = r.i32_array::<TEMPLATE_UNITS>();
        let sort_width = r.i32();

        let mut boxes = [[[0i16; 4]; 2]; TEMPLATE_UNITS];
        for unit in boxes.iter_mut() {
            for b in unit.iter_mut() {
                *b = r.i16_array::<4>();
            }
        }
        let sort_begin = r.i32();
        let comment = r.fixed_str(128);
        let src_id = r.u8();
        r.skip(1);
        let chan_id = r.u16();

        Self {
            name,
            sig_name,
            channel,
            wf_rate,
            sig,
            reference,
            gain,
            filter,
            threshold,
            method,
            n_units,
            templates,
            fit,
            sort_width,
            boxes,
            sort_begin,
            comment,
            src_id,
            chan_id,
        }
    }
}

/// Header of a digital event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventChannelHeader {
    pub name: String,
    /// 1-based event channel number
    pub channel: i32,
    pub comment: String,
    pub src_id: u8,
    pub chan_id: u16,
}

impl EventChannelHeader {
    fn parse(bytes: &[u8]) -> Self {
        let mut r = FieldReader::new(bytes);
        let name = r.fixed_str(32);
        let channel = r.i32();
        let comment = r.fixed_str(128);
        let src_id = r.u8();
        r.skip(1);
        let chan_id = r.u16();
        Self {
            name,
            channel,
            comment,
            src_id,
            chan_id,
        }
    }
}

/// Header of a slow (continuous analog) channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlowChannelHeader {
    pub name: String,
    /// 0-based analog channel number
    pub channel: i32,
    /// Sampling rate in Hz
    pub ad_frequency: i32,
    pub gain: i32,
    pub enabled: i32,
    pub pre_amp_gain: i32,
    pub spike_channel: i32,
    pub comment: String,
    pub src_id: u8,
    pub chan_id: u16,
}

impl SlowChannelHeader {
    fn parse(bytes: &[u8]) -> Self {
        let mut r = FieldReader::new(bytes);
        let name = r.fixed_str(32);
        let channel = r.i32();
        let ad_frequency = r.i32();
        let gain = r.i32();
        let enabled = r.i32();
        let pre_amp_gain = r.i32();
        let spike_channel = r.i32();
        let comment = r.fixed_str(128);
        let src_id = r.u8();
        r.skip(1);
        let chan_id = r.u16();
        Self {
            name,
            channel,
            ad_frequency,
            gain,
            enabled,
            pre_amp_gain,
            spike_channel,
            comment,
            src_id,
            chan_id,
        }
    }

    /// Calibration for this channel against the file's master tick rate.
    ///
    /// Fails with `InvalidFormat` when the channel field does not fit the
    /// 16-bit channel of a data block.
    pub fn calibration(&self, master_frequency: i32) -> Result<ContinuousCalibration> {
        let channel = i16::try_from(self.channel).map_err(|_| {
            PlxError::InvalidFormat(format!(
                "slow channel '{}' has out-of-range channel number {}",
                self.name, self.channel
            ))
        })?;
        Ok(ContinuousCalibration {
            channel,
            gain: self.gain,
            channel_frequency: self.ad_frequency,
            master_frequency,
        })
    }
}

/// The three channel tables, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelTables {
    pub dsp: Vec<DspChannelHeader>,
    pub events: Vec<EventChannelHeader>,
    pub slow: Vec<SlowChannelHeader>,
}

impl ChannelTables {
    /// Decodes the tables from `bytes`, which start right after the file
    /// header.
    pub fn parse(bytes: &[u8], header: &FileHeader) -> Result<Self> {
        let needed = header.channel_tables_size();
        if (bytes.len() as u64) < needed {
            return Err(PlxError::Truncated {
                what: "channel headers",
                needed,
                available: bytes.len() as u64,
            });
        }

        let (dsp_bytes, rest) =
            bytes.split_at(header.dsp_channel_count() * DSP_CHANNEL_HEADER_SIZE);
        let (event_bytes, rest) =
            rest.split_at(header.event_channel_count() * EVENT_CHANNEL_HEADER_SIZE);
        let slow_bytes = &rest[..header.slow_channel_count() * SLOW_CHANNEL_HEADER_SIZE];

        Ok(Self {
            dsp: dsp_bytes
                .chunks_exact(DSP_CHANNEL_HEADER_SIZE)
                .map(DspChannelHeader::parse)
                .collect(),
            events: event_bytes
                .chunks_exact(EVENT_CHANNEL_HEADER_SIZE)
                .map(EventChannelHeader::parse)
                .collect(),
            slow: slow_bytes
                .chunks_exact(SLOW_CHANNEL_HEADER_SIZE)
                .map(SlowChannelHeader::parse)
                .collect(),
        })
    }

    /// Reads the tables from `reader`, positioned right after the file header.
    ///
    /// The buffer grows only as bytes arrive, so a corrupt count in an
    /// unvalidated header ends in `Truncated` rather than a huge allocation.
    pub fn read_from<R: Read>(reader: &mut R, header: &FileHeader) -> Result<Self> {
        let needed = header.channel_tables_size();
        let mut buf = Vec::with_capacity(needed.min(MAX_TABLE_PREALLOC) as usize);
        Read::by_ref(reader)
            .take(needed)
            .read_to_end(&mut buf)
            .map_err(|e| PlxError::io(FILE_HEADER_SIZE as u64, e))?;
        Self::parse(&buf, header)
    }

    /// First DSP header whose channel field equals `channel`.
    pub fn dsp_channel(&self, channel: i32) -> Result<&DspChannelHeader> {
        self.dsp
            .iter()
            .find(|h| h.channel == channel)
            .ok_or(PlxError::UnknownChannel {
                kind: ChannelKind::Dsp,
                channel,
            })
    }

    /// First event header whose channel field equals `channel`.
    pub fn event_channel(&self, channel: i32) -> Result<&EventChannelHeader> {
        self.events
            .iter()
            .find(|h| h.channel == channel)
            .ok_or(PlxError::UnknownChannel {
                kind: ChannelKind::Event,
                channel,
            })
    }

    /// First slow header whose channel field equals `channel`.
    pub fn slow_channel(&self, channel: i32) -> Result<&SlowChannelHeader> {
        self.slow
            .iter()
            .find(|h| h.channel == channel)
            .ok_or(PlxError::UnknownChannel {
                kind: ChannelKind::Slow,
                channel,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::PlxBuilder;

    fn tables(builder: &PlxBuilder) -> (FileHeader, ChannelTables) {
        let bytes = builder.header_bytes();
        let header = FileHeader::parse(&bytes).unwrap();
        let tables = ChannelTables::parse(&bytes[FILE_HEADER_SIZE..], &header).unwrap();
        (header, tables)
    }

    #[test]
    fn test_tables_sized_to_declared_counts() {
        let builder = PlxBuilder::new(40000)
            .dsp_channel("sig001", 1, 32)
            .dsp_channel("sig003", 3, 16)
            .event_channel("EVT01", 1)
            .event_channel("Strobed", 257)
            .event_channel("Start", 258)
            .slow_channel("AD01", 0, 1000, 1)
            .slow_channel("AD05", 4, 2000, 5);
        let (_, tables) = tables(&builder);

        assert_eq!(tables.dsp.len(), 2);
        assert_eq!(tables.events.len(), 3);
        assert_eq!(tables.slow.len(), 2);

        let dsp = &tables.dsp[1];
        assert_eq!(dsp.name, "sig003");
        assert_eq!(dsp.channel, 3);
        assert_eq!(dsp.gain, 16);
        assert_eq!(dsp.threshold, -500);
        assert_eq!(dsp.templates[4][63], 63);
        assert_eq!(dsp.fit, [10; 5]);
        assert_eq!(dsp.sort_width, 64);
        assert_eq!(dsp.boxes[2][1][3], 7);
        assert_eq!(dsp.comment, "dsp comment");
        assert_eq!(dsp.src_id, 2);
        assert_eq!(dsp.chan_id, 3);

        assert_eq!(tables.events[1].name, "Strobed");
        assert_eq!(tables.events[1].channel, 257);

        let slow = &tables.slow[1];
        assert_eq!(slow.name, "AD05");
        assert_eq!(slow.ad_frequency, 2000);
        assert_eq!(slow.gain, 5);
        assert_eq!(slow.pre_amp_gain, 1000);
    }

    #[test]
    fn test_lookup_by_embedded_channel() {
        let builder = PlxBuilder::new(40000)
            .dsp_channel("sig005", 5, 32)
            .slow_channel("AD03", 2, 1000, 1)
            .slow_channel("AD01", 0, 1000, 4)
            .slow_channel("AD01-dup", 0, 500, 8);
        let (_, tables) = tables(&builder);

        assert_eq!(tables.dsp_channel(5).unwrap().name, "sig005");
        assert!(matches!(
            tables.dsp_channel(1),
            Err(PlxError::UnknownChannel {
                kind: ChannelKind::Dsp,
                channel: 1
            })
        ));

        // Position 1 holds channel 0; the first match wins.
        let slow = tables.slow_channel(0).unwrap();
        assert_eq!(slow.name, "AD01");
        assert_eq!(slow.gain, 4);
        assert!(tables.slow_channel(7).is_err());
        assert!(tables.event_channel(1).is_err());
    }

    #[test]
    fn test_truncated_tables() {
        let builder = PlxBuilder::new(40000)
            .dsp_channel("sig001", 1, 32)
            .event_channel("EVT01", 1);
        let bytes = builder.header_bytes();
        let header = FileHeader::parse(&bytes).unwrap();

        let cut = &bytes[FILE_HEADER_SIZE..bytes.len() - 1];
        match ChannelTables::parse(cut, &header) {
            Err(PlxError::Truncated {
                needed, available, ..
            }) => {
                assert_eq!(needed, 1020 + 296);
                assert_eq!(available, 1020 + 295);
            }
            other => panic!("expected Truncated, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_tables() {
        let (header, tables) = tables(&PlxBuilder::new(40000));
        assert_eq!(header.channel_tables_size(), 0);
        assert!(tables.dsp.is_empty());
        assert!(tables.events.is_empty());
        assert!(tables.slow.is_empty());
    }

    #[test]
    fn test_slow_channel_calibration() {
        let (header, tables) = tables(&PlxBuilder::new(40000).slow_channel("AD01", 0, 20000, 2));
        let cal = tables.slow[0].calibration(header.ad_frequency).unwrap();
        assert_eq!(cal.channel, 0);
        assert_eq!(cal.gain, 2);
        assert_eq!(cal.channel_frequency, 20000);
        assert_eq!(cal.master_frequency, 40000);
    }

    #[test]
    fn test_calibration_rejects_wide_channel_number() {
        let (header, tables) =
            tables(&PlxBuilder::new(40000).slow_channel("AD-wide", 40000, 1000, 1));
        let slow = tables.slow_channel(40000).unwrap();
        assert!(matches!(
            slow.calibration(header.ad_frequency),
            Err(PlxError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_read_from_corrupt_count_is_truncated() {
        let builder = PlxBuilder::new(40000).dsp_channel("sig001", 1, 32);
        let mut bytes = builder.header_bytes();
        // num_dsp_channels
        bytes[140..144].copy_from_slice(&i32::MAX.to_le_bytes());
        let header = FileHeader::parse(&bytes).unwrap();

        let mut rest = &bytes[FILE_HEADER_SIZE..];
        match ChannelTables::read_from(&mut rest, &header) {
            Err(PlxError::Truncated {
                what,
                needed,
                available,
            }) => {
                assert_eq!(what, "channel headers");
                assert_eq!(needed, i32::MAX as u64 * 1020);
                assert_eq!(available, 1020);
            }
            other => panic!("expected Truncated, got {:?}", other),
        }
    }
}
