//! Opened PLX file: header, channel tables and the block stream.

use crate::channels::ChannelTables;
use crate::convert::spike_voltage;
use crate::error::{PlxError, Result};
use crate::header::FileHeader;
use crate::index::RecordIndex;
use crate::query::{self, ContinuousQuery, EventQuery, Extraction, ExtractionPlan, SpikeQuery};
use crate::stream::BlockStream;
use crate::types::{ContinuousCalibration, ReadOptions, SpikeRecord};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// A PLX source with its header and channel tables decoded.
///
/// Header and tables are read once when the reader is created. Every query
/// rewinds the block stream to the data start, so queries can be repeated in
/// any order.
#[derive(Debug)]
pub struct PlxReader<R> {
    header: FileHeader,
    channels: ChannelTables,
    stream: BlockStream<R>,
}

impl PlxReader<BufReader<File>> {
    /// Opens a PLX file from disk with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, &ReadOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| PlxError::io(0, e))?;
        Self::with_options(BufReader::new(file), options)
    }
}

impl<R: Read + Seek> PlxReader<R> {
    /// Decodes header and channel tables from `reader` with default options.
    pub fn new(reader: R) -> Result<Self> {
        Self::with_options(reader, &ReadOptions::default())
    }

    pub fn with_options(mut reader: R, options: &ReadOptions) -> Result<Self> {
        reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| PlxError::io(0, e))?;
        let header = FileHeader::read_from(&mut reader)?;
        header.validate(options)?;
        let channels = ChannelTables::read_from(&mut reader, &header)?;
        let stream = BlockStream::new(reader, header.data_start_offset())?;
        Ok(Self {
            header,
            channels,
            stream,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn channels(&self) -> &ChannelTables {
        &self.channels
    }

    pub fn data_start_offset(&self) -> u64 {
        self.stream.data_start()
    }

    /// The underlying block stream for custom passes.
    pub fn stream(&mut self) -> &mut BlockStream<R> {
        &mut self.stream
    }

    /// Calibration of a 0-based analog channel from its slow channel header.
    pub fn continuous_calibration(&self, ad_channel: i16) -> Result<ContinuousCalibration> {
        let slow = self.channels.slow_channel(ad_channel as i32)?;
        slow.calibration(self.header.ad_frequency)
    }

    pub fn select_spikes(&mut self, channel: i16, unit: i16) -> Result<SpikeQuery<'_, R>> {
        query::select_spikes(&mut self.stream, channel, unit)
    }

    pub fn select_events(&mut self, channel: i16) -> Result<EventQuery<'_, R>> {
        query::select_events(&mut self.stream, channel)
    }

    /// Continuous samples of `ad_channel`, calibrated from its channel header.
    pub fn select_continuous(&mut self, ad_channel: i16) -> Result<ContinuousQuery<'_, R>> {
        let cal = self.continuous_calibration(ad_channel)?;
        query::select_continuous(
            &mut self.stream,
            ad_channel,
            cal.gain,
            cal.channel_frequency,
            cal.master_frequency,
        )
    }

    /// Waveform of `spike` in volts, using the gain of its DSP channel header.
    pub fn spike_voltages(&self, spike: &SpikeRecord) -> Result<Vec<f64>> {
        let gain = self.channels.dsp_channel(spike.channel as i32)?.gain;
        spike
            .waveform
            .iter()
            .flatten()
            .map(|&raw| spike_voltage(raw, gain))
            .collect()
    }

    pub fn extract(&mut self, plan: &ExtractionPlan) -> Result<Extraction> {
        plan.run(&mut self.stream)
    }

    pub fn build_index(&mut self) -> Result<RecordIndex> {
        RecordIndex::build(&mut self.stream)
    }

    pub fn into_inner(self) -> R {
        self.stream.into_inner()
    }
}
