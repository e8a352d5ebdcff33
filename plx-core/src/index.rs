//! Eager in-memory record index.
//!
//! Decodes the whole block stream once and keys every record by
//! `(kind, channel, unit)`. Repeated queries are then served from memory and
//! return the same records, in the same order, as a fresh scan would.

use crate::convert::ContinuousConverter;
use crate::decoder;
use crate::error::{PlxError, Result};
use crate::stream::BlockStream;
use crate::types::{
    AdBlockRecord, ContinuousCalibration, ContinuousSample, EventRecord, Record, RecordKind,
    SpikeRecord,
};
use log::debug;
use std::collections::BTreeMap;
use std::io::{Read, Seek};

/// Index key: record kind, channel, and unit (0 for non-spike records).
pub type IndexKey = (RecordKind, i16, i16);

/// All records of a file, in file order, with a per-key position index.
#[derive(Debug, Clone, Default)]
pub struct RecordIndex {
    records: Vec<Record>,
    offsets: Vec<u64>,
    positions: BTreeMap<IndexKey, Vec<usize>>,
    truncated_at: Option<u64>,
}

impl RecordIndex {
    /// Decodes every block from the data start.
    ///
    /// A cut-off final block ends the scan; the records before it are kept
    /// and the offset is available from [`RecordIndex::truncated_at`].
    pub fn build<R: Read + Seek>(stream: &mut BlockStream<R>) -> Result<Self> {
        stream.reset()?;
        let mut index = Self::default();

        for block in stream.by_ref() {
            match block {
                Ok(raw) => {
                    let offset = raw.offset;
                    index.push(decoder::classify(raw), offset);
                }
                Err(PlxError::TruncatedBlock { offset, .. }) => {
                    index.truncated_at = Some(offset);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            "indexed {} records under {} keys",
            index.records.len(),
            index.positions.len()
        );
        Ok(index)
    }

    fn push(&mut self, record: Record, offset: u64) {
        let key = (record.kind(), record.channel(), record.unit_key());
        self.positions
            .entry(key)
            .or_default()
            .push(self.records.len());
        self.records.push(record);
        self.offsets.push(offset);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every record in file order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Byte offset of the block behind record `i`, usable with
    /// [`BlockStream::seek_to`].
    pub fn offset(&self, i: usize) -> Option<u64> {
        self.offsets.get(i).copied()
    }

    pub fn truncated_at(&self) -> Option<u64> {
        self.truncated_at
    }

    /// Keys present in the file, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &IndexKey> + '_ {
        self.positions.keys()
    }

    /// Number of records stored under `key`.
    pub fn count(&self, key: IndexKey) -> usize {
        self.positions.get(&key).map_or(0, Vec::len)
    }

    fn lookup(&self, key: IndexKey) -> impl Iterator<Item = &Record> + '_ {
        self.positions
            .get(&key)
            .into_iter()
            .flatten()
            .map(move |&i| &self.records[i])
    }

    pub fn spikes(&self, channel: i16, unit: i16) -> impl Iterator<Item = &SpikeRecord> + '_ {
        self.lookup((RecordKind::Spike, channel, unit))
            .filter_map(|r| match r {
                Record::Spike(s) => Some(s),
                _ => None,
            })
    }

    pub fn events(&self, channel: i16) -> impl Iterator<Item = &EventRecord> + '_ {
        self.lookup((RecordKind::Event, channel, 0))
            .filter_map(|r| match r {
                Record::Event(e) => Some(e),
                _ => None,
            })
    }

    pub fn continuous_blocks(&self, channel: i16) -> impl Iterator<Item = &AdBlockRecord> + '_ {
        self.lookup((RecordKind::Continuous, channel, 0))
            .filter_map(|r| match r {
                Record::Continuous(b) => Some(b),
                _ => None,
            })
    }

    /// Timestamped voltages for the channel named in `calibration`.
    pub fn continuous(&self, calibration: &ContinuousCalibration) -> Result<Vec<ContinuousSample>> {
        let converter = ContinuousConverter::new(calibration)?;
        Ok(self
            .continuous_blocks(calibration.channel)
            .flat_map(|block| converter.samples(block))
            .collect())
    }
}
