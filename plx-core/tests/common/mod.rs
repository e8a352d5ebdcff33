//! Synthetic PLX file builder shared by unit and integration tests.
//!
//! Only depends on std so it can be compiled both inside the crate and as a
//! module of the integration test binaries.

#![allow(dead_code)]

pub const SPIKE: i16 = 1;
pub const EVENT: i16 = 4;
pub const CONTINUOUS: i16 = 5;
pub const STROBED: i16 = 257;

struct DspSpec {
    name: String,
    channel: i32,
    gain: i32,
}

struct EventSpec {
    name: String,
    channel: i32,
}

struct SlowSpec {
    name: String,
    channel: i32,
    ad_frequency: i32,
    gain: i32,
}

/// Builds the bytes of a PLX file: header, channel tables, data blocks.
pub struct PlxBuilder {
    ad_frequency: i32,
    comment: String,
    last_timestamp: f64,
    dsp: Vec<DspSpec>,
    events: Vec<EventSpec>,
    slow: Vec<SlowSpec>,
    ts_counts: Vec<(usize, usize, i32)>,
    ev_counts: Vec<(usize, i32)>,
    blocks: Vec<u8>,
}

fn put_str(out: &mut Vec<u8>, s: &str, len: usize) {
    let mut field = vec![0u8; len];
    let n = s.len().min(len - 1);
    field[..n].copy_from_slice(&s.as_bytes()[..n]);
    out.extend_from_slice(&field);
}

fn put_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Encodes one data block: 16-byte header plus payload.
pub fn block_bytes(
    block_type: i16,
    timestamp: u64,
    channel: i16,
    unit: i16,
    waveform_count: i16,
    words_per_waveform: i16,
    samples: &[i16],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + samples.len() * 2);
    out.extend_from_slice(&block_type.to_le_bytes());
    out.extend_from_slice(&((timestamp >> 32) as u16).to_le_bytes());
    out.extend_from_slice(&(timestamp as u32).to_le_bytes());
    out.extend_from_slice(&channel.to_le_bytes());
    out.extend_from_slice(&unit.to_le_bytes());
    out.extend_from_slice(&waveform_count.to_le_bytes());
    out.extend_from_slice(&words_per_waveform.to_le_bytes());
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

impl PlxBuilder {
    pub fn new(ad_frequency: i32) -> Self {
        Self {
            ad_frequency,
            comment: String::new(),
            last_timestamp: 0.0,
            dsp: Vec::new(),
            events: Vec::new(),
            slow: Vec::new(),
            ts_counts: Vec::new(),
            ev_counts: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }

    pub fn last_timestamp(mut self, ticks: f64) -> Self {
        self.last_timestamp = ticks;
        self
    }

    pub fn dsp_channel(mut self, name: &str, channel: i32, gain: i32) -> Self {
        self.dsp.push(DspSpec {
            name: name.to_string(),
            channel,
            gain,
        });
        self
    }

    pub fn event_channel(mut self, name: &str, channel: i32) -> Self {
        self.events.push(EventSpec {
            name: name.to_string(),
            channel,
        });
        self
    }

    pub fn slow_channel(mut self, name: &str, channel: i32, ad_frequency: i32, gain: i32) -> Self {
        self.slow.push(SlowSpec {
            name: name.to_string(),
            channel,
            ad_frequency,
            gain,
        });
        self
    }

    pub fn spike_count(mut self, channel: usize, unit: usize, count: i32) -> Self {
        self.ts_counts.push((channel, unit, count));
        self
    }

    pub fn event_count(mut self, slot: usize, count: i32) -> Self {
        self.ev_counts.push((slot, count));
        self
    }

    pub fn spike(self, timestamp: u64, channel: i16, unit: i16, waveform: &[i16]) -> Self {
        let wf = if waveform.is_empty() { 0 } else { 1 };
        self.block(SPIKE, timestamp, channel, unit, wf, waveform.len() as i16, waveform)
    }

    pub fn event(self, timestamp: u64, channel: i16, unit: i16) -> Self {
        self.block(EVENT, timestamp, channel, unit, 0, 0, &[])
    }

    pub fn ad_block(self, timestamp: u64, channel: i16, samples: &[i16]) -> Self {
        self.block(CONTINUOUS, timestamp, channel, 0, 1, samples.len() as i16, samples)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn block(
        mut self,
        block_type: i16,
        timestamp: u64,
        channel: i16,
        unit: i16,
        waveform_count: i16,
        words_per_waveform: i16,
        samples: &[i16],
    ) -> Self {
        self.blocks.extend(block_bytes(
            block_type,
            timestamp,
            channel,
            unit,
            waveform_count,
            words_per_waveform,
            samples,
        ));
        self
    }

    /// Appends arbitrary bytes after the blocks, e.g. a cut-off block.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.blocks.extend_from_slice(bytes);
        self
    }

    pub fn data_start(&self) -> usize {
        7504 + self.dsp.len() * 1020 + self.events.len() * 296 + self.slow.len() * 296
    }

    /// Header and channel tables, without data blocks.
    pub fn header_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data_start());

        out.extend_from_slice(&0x5845_4C50u32.to_le_bytes());
        put_i32(&mut out, 106);
        put_str(&mut out, &self.comment, 128);
        put_i32(&mut out, self.ad_frequency);
        put_i32(&mut out, self.dsp.len() as i32);
        put_i32(&mut out, self.events.len() as i32);
        put_i32(&mut out, self.slow.len() as i32);
        put_i32(&mut out, 32);
        put_i32(&mut out, 8);
        for v in [2003, 7, 14, 10, 30, 59] {
            put_i32(&mut out, v);
        }
        put_i32(&mut out, 0);
        put_i32(&mut out, 40000);
        out.extend_from_slice(&self.last_timestamp.to_le_bytes());
        out.extend_from_slice(&[1, 1, 12, 12]);
        out.extend_from_slice(&3000u16.to_le_bytes());
        out.extend_from_slice(&5000u16.to_le_bytes());
        out.extend_from_slice(&1000u16.to_le_bytes());
        put_str(&mut out, "test-acquire", 18);
        put_str(&mut out, "", 18);
        out.extend_from_slice(&[0u8; 10]);
        assert_eq!(out.len(), 256);

        let mut ts = vec![0i32; 130 * 5];
        for &(ch, unit, n) in &self.ts_counts {
            ts[ch * 5 + unit] = n;
        }
        for v in &ts {
            put_i32(&mut out, *v);
        }
        for v in &ts {
            put_i32(&mut out, *v);
        }
        let mut ev = vec![0i32; 512];
        for &(slot, n) in &self.ev_counts {
            ev[slot] = n;
        }
        for v in &ev {
            put_i32(&mut out, *v);
        }
        assert_eq!(out.len(), 7504);

        for d in &self.dsp {
            let start = out.len();
            put_str(&mut out, &d.name, 32);
            put_str(&mut out, &d.name, 32);
            // channel, wf_rate, sig, ref, gain, filter, threshold, method, n_units
            for v in [d.channel, 40000, d.channel, 0, d.gain, 1, -500, 2, 1] {
                put_i32(&mut out, v);
            }
            for i in 0..5 * 64 {
                out.extend_from_slice(&((i % 64) as i16).to_le_bytes());
            }
            for _ in 0..5 {
                put_i32(&mut out, 10);
            }
            put_i32(&mut out, 64);
            for _ in 0..5 * 2 * 4 {
                out.extend_from_slice(&7i16.to_le_bytes());
            }
            put_i32(&mut out, 0);
            put_str(&mut out, "dsp comment", 128);
            out.extend_from_slice(&[2, 0]);
            out.extend_from_slice(&(d.channel as u16).to_le_bytes());
            out.extend_from_slice(&[0u8; 40]);
            assert_eq!(out.len() - start, 1020);
        }

        for e in &self.events {
            let start = out.len();
            put_str(&mut out, &e.name, 32);
            put_i32(&mut out, e.channel);
            put_str(&mut out, "", 128);
            out.extend_from_slice(&[4, 0]);
            out.extend_from_slice(&(e.channel as u16).to_le_bytes());
            out.extend_from_slice(&[0u8; 128]);
            assert_eq!(out.len() - start, 296);
        }

        for s in &self.slow {
            let start = out.len();
            put_str(&mut out, &s.name, 32);
            // channel, ad_frequency, gain, enabled, pre_amp_gain, spike_channel
            for v in [s.channel, s.ad_frequency, s.gain, 1, 1000, 0] {
                put_i32(&mut out, v);
            }
            put_str(&mut out, "", 128);
            out.extend_from_slice(&[5, 0]);
            out.extend_from_slice(&((s.channel + 1) as u16).to_le_bytes());
            out.extend_from_slice(&[0u8; 108]);
            assert_eq!(out.len() - start, 296);
        }

        out
    }

    /// Complete file bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut out = self.header_bytes();
        out.extend_from_slice(&self.blocks);
        out
    }
}
