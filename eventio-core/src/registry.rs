//! Mapping from block type id to decoder.

use crate::central_event::{decode_central_event, CentralEvent};
use crate::cursor::ByteCursor;
use crate::error::Result;
use crate::header::BlockHeader;
use crate::pixel_list::{decode_pixel_list, PixelList};
use crate::run_header::{decode_run_header, RunHeader};
use crate::shower::{decode_shower, ShowerRecord};
use crate::shower_parameters::{decode_shower_parameters, ShowerParameters};
use crate::track_event::{decode_track_event, TrackEvent};
use crate::types::{
    track_event_telescope, ReaderConfig, TYPE_CENTRAL_EVENT, TYPE_MC_SHOWER, TYPE_PIXEL_LIST,
    TYPE_RUN_HEADER, TYPE_SHOWER,
};
use std::collections::HashMap;
use std::io::Read;

/// A decoded top-level record.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Shower(ShowerRecord),
    RunHeader(RunHeader),
    CentralEvent(CentralEvent),
    TrackEvent(TrackEvent),
    PixelList(PixelList),
    ShowerParameters(ShowerParameters),
}

/// Decodes one block body.
///
/// On `Ok` and on recoverable errors the cursor must be left at the
/// declared end of the block.
pub type DecodeFn<R> = fn(&BlockHeader, &mut ByteCursor<R>, &ReaderConfig) -> Result<Record>;

/// Selects the block types handled by a family decoder.
pub type TypeMatcher = fn(u16) -> bool;

/// Decoders keyed by block type id.
///
/// Exact registrations win over families. Families are tried in
/// registration order.
pub struct DecoderRegistry<R> {
    decoders: HashMap<u16, DecodeFn<R>>,
    families: Vec<(TypeMatcher, DecodeFn<R>)>,
}

impl<R: Read> Default for DecoderRegistry<R> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl<R: Read> DecoderRegistry<R> {
    /// Creates a registry without any decoder.
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
            families: Vec::new(),
        }
    }

    /// Creates a registry with every decoder of this crate: MC shower, run
    /// header, central event, reconstructed shower, pixel list and the
    /// per-telescope tracking events.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TYPE_MC_SHOWER, |header, cursor, _| {
            decode_shower(header, cursor).map(Record::Shower)
        });
        registry.register(TYPE_RUN_HEADER, |header, cursor, config| {
            decode_run_header(header, cursor, config).map(Record::RunHeader)
        });
        registry.register(TYPE_CENTRAL_EVENT, |header, cursor, config| {
            decode_central_event(header, cursor, config).map(Record::CentralEvent)
        });
        registry.register(TYPE_SHOWER, |header, cursor, config| {
            decode_shower_parameters(header, cursor, config).map(Record::ShowerParameters)
        });
        registry.register(TYPE_PIXEL_LIST, |header, cursor, _| {
            decode_pixel_list(header, cursor).map(Record::PixelList)
        });
        registry.register_family(
            |type_id| track_event_telescope(type_id).is_some(),
            |header, cursor, _| decode_track_event(header, cursor).map(Record::TrackEvent),
        );
        registry
    }

    /// Registers `decoder` for `type_id`, returning the decoder it replaces.
    pub fn register(&mut self, type_id: u16, decoder: DecodeFn<R>) -> Option<DecodeFn<R>> {
        self.decoders.insert(type_id, decoder)
    }

    /// Registers `decoder` for every type id accepted by `matcher`.
    pub fn register_family(&mut self, matcher: TypeMatcher, decoder: DecodeFn<R>) {
        self.families.push((matcher, decoder));
    }

    /// Returns the decoder for `type_id`.
    pub fn get(&self, type_id: u16) -> Option<DecodeFn<R>> {
        self.decoders.get(&type_id).copied().or_else(|| {
            self.families
                .iter()
                .find(|(matches, _)| matches(type_id))
                .map(|&(_, decoder)| decoder)
        })
    }

    /// Returns `true` if a decoder is registered for `type_id`.
    pub fn contains(&self, type_id: u16) -> bool {
        self.get(type_id).is_some()
    }
}
