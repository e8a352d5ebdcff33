//! Filtered extraction over the block stream.
//!
//! Every `select_*` function rewinds the stream to the data start and walks
//! it once, lazily yielding the matching records in file order. For several
//! extractions from the same file, [`ExtractionPlan`] answers all of them in
//! a single pass with the same ordering and filtering.

use crate::convert::ContinuousConverter;
use crate::error::{PlxError, Result};
use crate::stream::{BlockStream, Records};
use crate::types::{ContinuousCalibration, ContinuousSample, EventRecord, Record, SpikeRecord};
use log::debug;
use std::io::{Read, Seek};

/// Spikes of one `(channel, unit)` pair, see [`select_spikes`].
pub struct SpikeQuery<'a, R> {
    records: Records<'a, R>,
    channel: i16,
    unit: i16,
}

impl<R: Read + Seek> Iterator for SpikeQuery<'_, R> {
    type Item = Result<SpikeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        for record in self.records.by_ref() {
            match record {
                Ok(Record::Spike(s)) if s.channel == self.channel && s.unit == self.unit => {
                    return Some(Ok(s))
                }
                Ok(_) => {}
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

/// Events of one channel, see [`select_events`].
pub struct EventQuery<'a, R> {
    records: Records<'a, R>,
    channel: i16,
}

impl<R: Read + Seek> Iterator for EventQuery<'_, R> {
    type Item = Result<EventRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        for record in self.records.by_ref() {
            match record {
                Ok(Record::Event(e)) if e.channel == self.channel => return Some(Ok(e)),
                Ok(_) => {}
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

/// Timestamped voltages of one analog channel, see [`select_continuous`].
pub struct ContinuousQuery<'a, R> {
    records: Records<'a, R>,
    channel: i16,
    converter: ContinuousConverter,
    pending: std::vec::IntoIter<ContinuousSample>,
}

impl<R: Read + Seek> Iterator for ContinuousQuery<'_, R> {
    type Item = Result<ContinuousSample>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(sample) = self.pending.next() {
                return Some(Ok(sample));
            }
            match self.records.next()? {
                Ok(Record::Continuous(block)) if block.channel == self.channel => {
                    self.pending = self
                        .converter
                        .samples(&block)
                        .collect::<Vec<_>>()
                        .into_iter();
                }
                Ok(_) => {}
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Spikes on a 1-based DSP `channel` sorted into `unit`.
pub fn select_spikes<R: Read + Seek>(
    stream: &mut BlockStream<R>,
    channel: i16,
    unit: i16,
) -> Result<SpikeQuery<'_, R>> {
    stream.reset()?;
    Ok(SpikeQuery {
        records: stream.records(),
        channel,
        unit,
    })
}

/// Events on a 1-based event `channel`.
pub fn select_events<R: Read + Seek>(
    stream: &mut BlockStream<R>,
    channel: i16,
) -> Result<EventQuery<'_, R>> {
    stream.reset()?;
    Ok(EventQuery {
        records: stream.records(),
        channel,
    })
}

/// Samples of a 0-based analog channel as `(timestamp, voltage)` pairs.
///
/// Fails with [`PlxError::MissingCalibration`] before scanning when the gain
/// or either frequency is zero.
pub fn select_continuous<R: Read + Seek>(
    stream: &mut BlockStream<R>,
    ad_channel: i16,
    gain: i32,
    channel_frequency: i32,
    master_frequency: i32,
) -> Result<ContinuousQuery<'_, R>> {
    let converter = ContinuousConverter::new(&ContinuousCalibration {
        channel: ad_channel,
        gain,
        channel_frequency,
        master_frequency,
    })?;
    stream.reset()?;
    Ok(ContinuousQuery {
        records: stream.records(),
        channel: ad_channel,
        converter,
        pending: Vec::new().into_iter(),
    })
}

/// A set of extractions answered by one pass over the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionPlan {
    spikes: Option<(i16, i16)>,
    events: Option<i16>,
    continuous: Option<ContinuousCalibration>,
}

/// Results of an [`ExtractionPlan`].
#[derive(Debug)]
pub struct Extraction {
    pub spikes: Vec<SpikeRecord>,
    pub events: Vec<EventRecord>,
    /// Calibration problems are reported here without affecting the other
    /// result sets.
    pub continuous: Result<Vec<ContinuousSample>>,
    /// Offset of the cut-off block when the pass ended on a truncation.
    pub truncated_at: Option<u64>,
}

impl ExtractionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spikes(mut self, channel: i16, unit: i16) -> Self {
        self.spikes = Some((channel, unit));
        self
    }

    pub fn events(mut self, channel: i16) -> Self {
        self.events = Some(channel);
        self
    }

    pub fn continuous(mut self, calibration: ContinuousCalibration) -> Self {
        self.continuous = Some(calibration);
        self
    }

    /// Runs every requested extraction in one pass from the data start.
    pub fn run<R: Read + Seek>(&self, stream: &mut BlockStream<R>) -> Result<Extraction> {
        let converter = self.continuous.as_ref().map(ContinuousConverter::new);
        let mut continuous_error = None;
        let converter = match converter {
            Some(Ok(c)) => self.continuous.map(|cal| (cal.channel, c)),
            Some(Err(e)) => {
                continuous_error = Some(e);
                None
            }
            None => None,
        };

        let mut out = Extraction {
            spikes: Vec::new(),
            events: Vec::new(),
            continuous: Ok(Vec::new()),
            truncated_at: None,
        };
        let mut samples = Vec::new();

        stream.reset()?;
        for record in stream.records() {
            match record {
                Ok(Record::Spike(s)) if self.spikes == Some((s.channel, s.unit)) => {
                    out.spikes.push(s)
                }
                Ok(Record::Event(e)) if self.events == Some(e.channel) => out.events.push(e),
                Ok(Record::Continuous(block)) => {
                    if let Some((channel, conv)) = &converter {
                        if block.channel == *channel {
                            samples.extend(conv.samples(&block));
                        }
                    }
                }
                Ok(_) => {}
                Err(PlxError::TruncatedBlock { offset, .. }) => {
                    out.truncated_at = Some(offset);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        out.continuous = match continuous_error {
            Some(e) => Err(e),
            None => Ok(samples),
        };
        debug!(
            "single-pass extraction: {} spikes, {} events, {} continuous samples",
            out.spikes.len(),
            out.events.len(),
            out.continuous.as_ref().map_or(0, Vec::len)
        );
        Ok(out)
    }
}
