//! Calibrated conversion of raw samples.
//!
//! Raw A/D values are 12-bit signed counts. Spike waveforms span ±3 V and
//! continuous channels ±5 V at 2048 counts, both divided by the channel gain.
//! Continuous blocks only store the time of their first sample; the rest are
//! spaced by the channel's sampling period expressed in master ticks.

use crate::error::{PlxError, Result};
use crate::types::{AdBlockRecord, ContinuousCalibration, ContinuousSample};
use log::warn;

const AD_FULL_SCALE_COUNTS: f64 = 2048.0;
const SPIKE_FULL_SCALE_VOLTS: f64 = 3.0;
const CONTINUOUS_FULL_SCALE_VOLTS: f64 = 5.0;

fn check_gain(gain: i32) -> Result<f64> {
    if gain == 0 {
        return Err(PlxError::MissingCalibration("gain is 0".to_string()));
    }
    Ok(gain as f64)
}

/// Spike waveform sample in volts.
pub fn spike_voltage(raw: i16, gain: i32) -> Result<f64> {
    let gain = check_gain(gain)?;
    Ok(raw as f64 * SPIKE_FULL_SCALE_VOLTS / AD_FULL_SCALE_COUNTS / gain)
}

/// Continuous sample in volts.
pub fn ad_voltage(raw: i16, gain: i32) -> Result<f64> {
    let gain = check_gain(gain)?;
    Ok(raw as f64 * CONTINUOUS_FULL_SCALE_VOLTS / AD_FULL_SCALE_COUNTS / gain)
}

/// Master ticks between two consecutive samples of a continuous channel.
///
/// Integer division, as the file format defines it.
pub fn ticks_per_sample(master_frequency: i32, channel_frequency: i32) -> Result<u64> {
    if channel_frequency <= 0 {
        return Err(PlxError::MissingCalibration(format!(
            "channel sampling frequency is {}",
            channel_frequency
        )));
    }
    if master_frequency <= 0 {
        return Err(PlxError::MissingCalibration(format!(
            "master tick frequency is {}",
            master_frequency
        )));
    }
    let ticks = (master_frequency / channel_frequency) as u64;
    if ticks == 0 {
        warn!(
            "channel frequency {} Hz exceeds master frequency {} Hz; all samples share one timestamp",
            channel_frequency, master_frequency
        );
    }
    Ok(ticks)
}

/// Per-sample timestamps for a continuous block.
pub fn reconstruct_continuous_timestamps(
    block: &AdBlockRecord,
    master_frequency: i32,
    channel_frequency: i32,
) -> Result<Vec<u64>> {
    let step = ticks_per_sample(master_frequency, channel_frequency)?;
    Ok((0..block.samples.len() as u64)
        .map(|i| block.timestamp + i * step)
        .collect())
}

/// Converts ticks to seconds at the given master frequency.
pub fn ticks_to_seconds(ticks: u64, master_frequency: i32) -> Option<f64> {
    if master_frequency <= 0 {
        return None;
    }
    Some(ticks as f64 / master_frequency as f64)
}

/// Validated continuous calibration, ready to convert whole blocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContinuousConverter {
    gain: f64,
    step: u64,
}

impl ContinuousConverter {
    pub fn new(calibration: &ContinuousCalibration) -> Result<Self> {
        let gain = check_gain(calibration.gain).map_err(|_| {
            PlxError::MissingCalibration(format!(
                "gain is 0 on analog channel {}",
                calibration.channel
            ))
        })?;
        let step = ticks_per_sample(calibration.master_frequency, calibration.channel_frequency)?;
        Ok(Self { gain, step })
    }

    pub fn ticks_per_sample(&self) -> u64 {
        self.step
    }

    /// Expands a block into one timestamped voltage per sample.
    pub fn samples<'a>(
        &self,
        block: &'a AdBlockRecord,
    ) -> impl Iterator<Item = ContinuousSample> + 'a {
        let Self { gain, step } = *self;
        block
            .samples
            .iter()
            .enumerate()
            .map(move |(i, &raw)| ContinuousSample {
                timestamp: block.timestamp + i as u64 * step,
                voltage: raw as f64 * CONTINUOUS_FULL_SCALE_VOLTS / AD_FULL_SCALE_COUNTS / gain,
            })
    }
}
