//! Forward-only cursor over the data block section.
//!
//! Each block is a 16-byte header optionally followed by
//! `waveform_count * words_per_waveform` little-endian `i16` samples. The
//! header alone decides how many bytes belong to the block, so the stream
//! can only be walked front to back. A pass can be restarted from the data
//! start, or from any block offset recorded earlier, with a cheap seek.

use crate::decoder;
use crate::error::{PlxError, Result};
use crate::parser::{parse_block_header, parse_samples, read_up_to};
use crate::types::{RawBlock, Record, DATA_BLOCK_HEADER_SIZE};
use log::{debug, warn};
use std::io::{Read, Seek, SeekFrom};

/// Upper bound on the up-front payload allocation. Larger payloads still
/// decode; the buffer just grows as bytes actually arrive.
const MAX_PAYLOAD_PREALLOC: usize = 64 * 1024;

/// Lazy, restartable sequence of raw data blocks.
///
/// Iterating yields `Ok` blocks until the end of data. A block cut off by
/// the end of input yields a single [`PlxError::TruncatedBlock`], after which
/// the pass is over; blocks yielded before it are unaffected.
#[derive(Debug)]
pub struct BlockStream<R> {
    reader: R,
    data_start: u64,
    position: u64,
    finished: bool,
    blocks_read: u64,
}

impl<R: Read + Seek> BlockStream<R> {
    /// Positions `reader` at `data_start` and returns a stream over the
    /// blocks from there on.
    pub fn new(mut reader: R, data_start: u64) -> Result<Self> {
        reader
            .seek(SeekFrom::Start(data_start))
            .map_err(|e| PlxError::io(data_start, e))?;
        Ok(Self {
            reader,
            data_start,
            position: data_start,
            finished: false,
            blocks_read: 0,
        })
    }

    /// Offset the stream was opened at.
    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    /// Offset of the next block header.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Restarts the pass at the data start.
    pub fn reset(&mut self) -> Result<()> {
        self.seek_to(self.data_start)
    }

    /// Restarts the pass at `offset`, which must be the offset of a block
    /// header (such as [`RawBlock::offset`] from an earlier pass).
    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| PlxError::io(offset, e))?;
        debug!("block stream reset to offset {}", offset);
        self.position = offset;
        self.finished = false;
        self.blocks_read = 0;
        Ok(())
    }

    /// Reads the next block, or `Ok(None)` at the end of data.
    pub fn next_block(&mut self) -> Result<Option<RawBlock>> {
        if self.finished {
            return Ok(None);
        }
        let offset = self.position;

        let mut head = [0u8; DATA_BLOCK_HEADER_SIZE];
        let got = match read_up_to(&mut self.reader, &mut head) {
            Ok(n) => n,
            Err(e) => return Err(self.fail(PlxError::io(offset, e))),
        };
        if got == 0 {
            self.finished = true;
            debug!(
                "block stream ended at offset {} after {} blocks",
                offset, self.blocks_read
            );
            return Ok(None);
        }
        if got < DATA_BLOCK_HEADER_SIZE {
            return Err(self.truncated(offset, DATA_BLOCK_HEADER_SIZE, got));
        }

        let header = parse_block_header(&head);
        let needed = header.payload_bytes();
        let mut payload = Vec::with_capacity(needed.min(MAX_PAYLOAD_PREALLOC));
        if needed > 0 {
            let payload_offset = offset + DATA_BLOCK_HEADER_SIZE as u64;
            let read = Read::by_ref(&mut self.reader)
                .take(needed as u64)
                .read_to_end(&mut payload);
            if let Err(e) = read {
                return Err(self.fail(PlxError::io(payload_offset, e)));
            }
            if payload.len() < needed {
                return Err(self.truncated(
                    offset,
                    DATA_BLOCK_HEADER_SIZE + needed,
                    DATA_BLOCK_HEADER_SIZE + payload.len(),
                ));
            }
        }

        self.position = offset + (DATA_BLOCK_HEADER_SIZE + needed) as u64;
        self.blocks_read += 1;
        Ok(Some(RawBlock {
            offset,
            header,
            samples: parse_samples(&payload),
        }))
    }

    /// Adapts the stream into a sequence of decoded records.
    pub fn records(&mut self) -> Records<'_, R> {
        Records { stream: self }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn fail(&mut self, err: PlxError) -> PlxError {
        self.finished = true;
        err
    }

    fn truncated(&mut self, offset: u64, needed: usize, available: usize) -> PlxError {
        warn!(
            "data block at offset {} is cut off: {} of {} bytes present, {} complete blocks before it",
            offset, available, needed, self.blocks_read
        );
        self.fail(PlxError::TruncatedBlock {
            offset,
            needed: needed as u64,
            available: available as u64,
        })
    }
}

impl<R: Read + Seek> Iterator for BlockStream<R> {
    type Item = Result<RawBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block().transpose()
    }
}

/// Decoded view of a [`BlockStream`], see [`BlockStream::records`].
pub struct Records<'a, R> {
    stream: &'a mut BlockStream<R>,
}

impl<R: Read + Seek> Iterator for Records<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.stream
            .next_block()
            .transpose()
            .map(|block| block.map(decoder::classify))
    }
}
