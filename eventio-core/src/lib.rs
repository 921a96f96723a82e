//! EventIO decoder for simulated gamma-ray telescope array data.
//!
//! EventIO files are a sequence of self-describing blocks. Each block
//! carries a type id, a layout version, an identification number and its
//! byte length, so a reader can skip blocks it does not understand and
//! recover from blocks it fails to decode.
//!
//! # Example
//!
//! ```no_run
//! use eventio_core::{BlockOutcome, EventIoReader, Record};
//!
//! let mut reader = EventIoReader::open("gamma_20deg.simtel").unwrap();
//! while let Some(outcome) = reader.next_block().unwrap() {
//!     if let BlockOutcome::Decoded { record: Record::Shower(shower), .. } = outcome {
//!         println!("shower {}: {} TeV", shower.shower_num, shower.energy);
//!     }
//! }
//! println!("{:?}", reader.stats());
//! ```
//!
//! # Features
//!
//! - Big- and little-endian blocks in the same stream
//! - Resynchronisation on the next sync marker after corrupt bytes
//! - Version-gated field layouts with documented defaults
//! - MC shower, run header and central trigger event decoders
//! - Reconstructed shower, pixel list and tracking event decoders
//! - Pluggable decoders per block type

pub mod central_event;
pub mod cursor;
pub mod error;
pub mod header;
pub mod pixel_list;
pub mod plan;
pub mod registry;
pub mod run_header;
pub mod shower;
pub mod shower_parameters;
pub mod stream;
pub mod time;
pub mod track_event;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use cursor::ByteCursor;
pub use error::{EventIoError, Result};
pub use header::BlockHeader;
pub use pixel_list::PixelList;
pub use registry::{DecodeFn, DecoderRegistry, Record};
pub use run_header::RunHeader;
pub use shower::{decode_shower, ExtraParameters, ProfileEntry, ShowerRecord};
pub use shower_parameters::ShowerParameters;
pub use stream::{decode_file, BlockOutcome, DecodeResult, EventIoReader, ReadStats};
pub use time::HTime;
pub use track_event::{Pointing, TrackEvent};
pub use types::{ByteOrder, ReaderConfig, SyncPolicy};
