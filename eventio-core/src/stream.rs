//! Pull-based block reader over an EventIO stream.
//!
//! [`EventIoReader`] locates each top-level block, hands its body to the
//! decoder registered for the block type and always leaves the cursor at
//! the declared block end before looking for the next one. Per-block
//! failures are reported as [`BlockOutcome::Failed`]; IO and framing
//! failures end the stream.

use crate::central_event::CentralEvent;
use crate::cursor::ByteCursor;
use crate::error::{EventIoError, Result};
use crate::header::BlockHeader;
use crate::pixel_list::PixelList;
use crate::registry::{DecoderRegistry, Record};
use crate::run_header::RunHeader;
use crate::shower::ShowerRecord;
use crate::shower_parameters::ShowerParameters;
use crate::track_event::TrackEvent;
use crate::types::{type_name, ReaderConfig};
use log::{debug, error, warn};
use std::fs::File;
use std::io::{BufReader, Read};
use std::iter::FusedIterator;
use std::path::Path;

/// Result of reading one top-level block.
#[derive(Debug)]
pub enum BlockOutcome {
    /// The block was decoded.
    Decoded { header: BlockHeader, record: Record },
    /// No decoder is registered for the block type; the block was skipped.
    Unknown { header: BlockHeader },
    /// The block could not be decoded and was skipped.
    ///
    /// `header` is `None` when the header itself was invalid.
    Failed {
        header: Option<BlockHeader>,
        error: EventIoError,
    },
}

impl BlockOutcome {
    /// Header of the block, if it could be read.
    pub fn header(&self) -> Option<&BlockHeader> {
        match self {
            Self::Decoded { header, .. } | Self::Unknown { header } => Some(header),
            Self::Failed { header, .. } => header.as_ref(),
        }
    }
}

/// Counters kept while reading a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Top-level blocks whose header was found.
    pub blocks_read: u64,
    pub decoded: u64,
    pub unknown: u64,
    pub failed: u64,
    /// Bytes skipped while searching for sync markers.
    pub skipped_bytes: u64,
}

/// Records collected from a whole stream.
#[derive(Debug, Default)]
pub struct DecodeResult {
    pub showers: Vec<ShowerRecord>,
    pub run_headers: Vec<RunHeader>,
    pub central_events: Vec<CentralEvent>,
    pub track_events: Vec<TrackEvent>,
    pub pixel_lists: Vec<PixelList>,
    pub shower_parameters: Vec<ShowerParameters>,
    pub stats: ReadStats,
}

impl DecodeResult {
    fn push(&mut self, record: Record) {
        match record {
            Record::Shower(shower) => self.showers.push(shower),
            Record::RunHeader(run_header) => self.run_headers.push(run_header),
            Record::CentralEvent(event) => self.central_events.push(event),
            Record::TrackEvent(track) => self.track_events.push(track),
            Record::PixelList(list) => self.pixel_lists.push(list),
            Record::ShowerParameters(params) => self.shower_parameters.push(params),
        }
    }
}

/// Reads top-level blocks one at a time.
pub struct EventIoReader<R> {
    cursor: ByteCursor<R>,
    registry: DecoderRegistry<R>,
    config: ReaderConfig,
    stats: ReadStats,
    run_header: Option<RunHeader>,
    finished: bool,
}

impl EventIoReader<BufReader<File>> {
    /// Opens a file with the default configuration.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> EventIoReader<R> {
    /// Creates a reader with the default configuration and decoders.
    pub fn new(source: R) -> Self {
        Self::with_config(source, ReaderConfig::default())
    }

    /// Creates a reader with the default decoders.
    pub fn with_config(source: R, config: ReaderConfig) -> Self {
        Self {
            cursor: ByteCursor::new(source),
            registry: DecoderRegistry::with_defaults(),
            config,
            stats: ReadStats::default(),
            run_header: None,
            finished: false,
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn stats(&self) -> ReadStats {
        self.stats
    }

    /// The most recent run header, used to resolve telescope ids.
    pub fn run_header(&self) -> Option<&RunHeader> {
        self.run_header.as_ref()
    }

    /// Bytes consumed from the source so far.
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Gives access to the decoders, e.g. to register additional types.
    pub fn registry_mut(&mut self) -> &mut DecoderRegistry<R> {
        &mut self.registry
    }

    /// Reads the next top-level block.
    ///
    /// Returns `Ok(None)` at the end of the stream. After an `Err` the
    /// stream position is unreliable and every further call returns
    /// `Ok(None)`.
    pub fn next_block(&mut self) -> Result<Option<BlockOutcome>> {
        if self.finished {
            return Ok(None);
        }
        let result = self.read_block();
        if !matches!(result, Ok(Some(_))) {
            self.finished = true;
        }
        result
    }

    fn read_block(&mut self) -> Result<Option<BlockOutcome>> {
        let scan_start = self.cursor.position();
        let header = match BlockHeader::find_next(&mut self.cursor, self.config.sync_policy) {
            Ok(Some(header)) => header,
            Ok(None) => return Ok(None),
            Err(err) if err.is_recoverable() => {
                warn!("Skipping block at offset {}: {}", scan_start, err);
                self.stats.failed += 1;
                return Ok(Some(BlockOutcome::Failed {
                    header: None,
                    error: err,
                }));
            }
            Err(err) => return Err(err),
        };
        self.stats.blocks_read += 1;
        self.stats.skipped_bytes += header.start_position() - scan_start;

        let Some(decode) = self.registry.get(header.type_id) else {
            debug!(
                "No decoder for block type {} ({}), skipping {} bytes",
                header.type_id,
                type_name(header.type_id).unwrap_or("unknown"),
                header.declared_length
            );
            header.align_end(&mut self.cursor)?;
            self.stats.unknown += 1;
            return Ok(Some(BlockOutcome::Unknown { header }));
        };

        let decoded = decode(&header, &mut self.cursor, &self.config)
            .and_then(|record| self.check_telescope(record));
        match decoded {
            Ok(record) => {
                header.align_end(&mut self.cursor)?;
                if let Record::RunHeader(run_header) = &record {
                    self.run_header = Some(run_header.clone());
                }
                self.stats.decoded += 1;
                Ok(Some(BlockOutcome::Decoded { header, record }))
            }
            Err(err) if err.is_recoverable() => {
                header.align_end(&mut self.cursor)?;
                warn!(
                    "Skipping block type {} id {} at offset {}: {}",
                    header.type_id,
                    header.identification,
                    header.start_position(),
                    err
                );
                self.stats.failed += 1;
                Ok(Some(BlockOutcome::Failed {
                    header: Some(header),
                    error: err,
                }))
            }
            Err(err) => {
                error!(
                    "Stream error in block type {} at offset {}: {}",
                    header.type_id,
                    header.start_position(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Rejects tracking data of telescopes missing from the current run.
    fn check_telescope(&self, record: Record) -> Result<Record> {
        if let (Record::TrackEvent(track), Some(run_header)) = (&record, &self.run_header) {
            if run_header.tel_index(track.tel_id).is_none() {
                return Err(EventIoError::invalid(
                    "tracking event",
                    format!("telescope {} is not part of run {}", track.tel_id, run_header.run),
                ));
            }
        }
        Ok(record)
    }

    /// Reads the remaining stream and collects the decoded records.
    ///
    /// Failed and unknown blocks are counted in the stats. A fatal error
    /// discards the records collected so far.
    pub fn read_all(&mut self) -> Result<DecodeResult> {
        let mut result = DecodeResult::default();
        while let Some(outcome) = self.next_block()? {
            if let BlockOutcome::Decoded { record, .. } = outcome {
                result.push(record);
            }
        }
        result.stats = self.stats;
        Ok(result)
    }

    /// Consumes the reader and returns the underlying source.
    pub fn into_inner(self) -> R {
        self.cursor.into_inner()
    }
}

impl<R: Read> Iterator for EventIoReader<R> {
    type Item = Result<BlockOutcome>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block().transpose()
    }
}

impl<R: Read> FusedIterator for EventIoReader<R> {}

/// Decodes a whole EventIO file with the default configuration.
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<DecodeResult> {
    EventIoReader::open(path)?.read_all()
}
