//! Core types shared across the EventIO decoder.
//!
//! This module defines the byte order model, the well-known block type ids
//! and the reader configuration.

/// Byte order of the multi-byte fields in a block.
///
/// Determined from the byte pattern of the sync marker in front of every
/// top-level block. Nested items inherit the order of their top-level block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Most significant byte first (sync bytes `D4 1F 8A 37`).
    #[default]
    BigEndian,
    /// Least significant byte first (sync bytes `37 8A 1F D4`).
    LittleEndian,
}

/// Run header common to measured and simulated data.
pub const TYPE_RUN_HEADER: u16 = 2000;
/// MC run header.
pub const TYPE_MC_RUN_HEADER: u16 = 2001;
/// Camera settings.
pub const TYPE_CAMERA_SETTINGS: u16 = 2002;
/// Camera organisation.
pub const TYPE_CAMERA_ORGANISATION: u16 = 2003;
/// Pixel settings.
pub const TYPE_PIXEL_SETTINGS: u16 = 2004;
/// Disabled pixels.
pub const TYPE_PIXEL_DISABLED: u16 = 2005;
/// Camera software settings.
pub const TYPE_CAMERA_SOFTWARE_SETTINGS: u16 = 2006;
/// Pointing corrections.
pub const TYPE_POINTING_CORRECTION: u16 = 2007;
/// Tracking setup.
pub const TYPE_TRACKING_SETUP: u16 = 2008;
/// Central trigger event.
pub const TYPE_CENTRAL_EVENT: u16 = 2009;
/// Full event container.
pub const TYPE_EVENT: u16 = 2010;
/// Reconstructed shower parameters.
pub const TYPE_SHOWER: u16 = 2015;
/// List of pixels, e.g. triggered or selected for an image.
pub const TYPE_PIXEL_LIST: u16 = 2027;
/// Simulated (MC) shower.
pub const TYPE_MC_SHOWER: u16 = 2020;
/// Simulated (MC) event.
pub const TYPE_MC_EVENT: u16 = 2021;
/// Telescope monitoring data.
pub const TYPE_TEL_MONITORING: u16 = 2022;
/// Laser calibration data.
pub const TYPE_LASER_CALIBRATION: u16 = 2023;
/// Run statistics.
pub const TYPE_RUN_STATISTICS: u16 = 2024;
/// MC run statistics.
pub const TYPE_MC_RUN_STATISTICS: u16 = 2025;
/// Extra parameters attached to an MC shower (nested item).
pub const TYPE_SHOWER_EXTRA_PARAMETERS: u16 = 1215;
/// Tracking data of telescope 0. Other telescopes use
/// `2100 + id % 100 + 1000 * (id / 100)`.
pub const TYPE_TRACK_EVENT: u16 = 2100;

/// Returns the telescope id encoded in a tracking event block type.
pub fn track_event_telescope(type_id: u16) -> Option<i16> {
    let offset = type_id.checked_sub(TYPE_TRACK_EVENT)?;
    if offset % 1000 >= 100 {
        return None;
    }
    i16::try_from(offset % 1000 + 100 * (offset / 1000)).ok()
}

/// Returns the tracking event block type of telescope `tel_id`.
pub fn track_event_type(tel_id: i16) -> Option<u16> {
    let id = u16::try_from(tel_id).ok()?;
    (id / 100)
        .checked_mul(1000)?
        .checked_add(TYPE_TRACK_EVENT + id % 100)
}

/// Returns a human-readable name for well-known block types.
pub fn type_name(type_id: u16) -> Option<&'static str> {
    let name = match type_id {
        TYPE_RUN_HEADER => "run header",
        TYPE_MC_RUN_HEADER => "MC run header",
        TYPE_CAMERA_SETTINGS => "camera settings",
        TYPE_CAMERA_ORGANISATION => "camera organisation",
        TYPE_PIXEL_SETTINGS => "pixel settings",
        TYPE_PIXEL_DISABLED => "disabled pixels",
        TYPE_CAMERA_SOFTWARE_SETTINGS => "camera software settings",
        TYPE_POINTING_CORRECTION => "pointing correction",
        TYPE_TRACKING_SETUP => "tracking setup",
        TYPE_CENTRAL_EVENT => "central event",
        TYPE_EVENT => "event",
        TYPE_SHOWER => "reconstructed shower",
        TYPE_MC_SHOWER => "MC shower",
        TYPE_MC_EVENT => "MC event",
        TYPE_TEL_MONITORING => "telescope monitoring",
        TYPE_LASER_CALIBRATION => "laser calibration",
        TYPE_RUN_STATISTICS => "run statistics",
        TYPE_MC_RUN_STATISTICS => "MC run statistics",
        TYPE_PIXEL_LIST => "pixel list",
        TYPE_SHOWER_EXTRA_PARAMETERS => "shower extra parameters",
        _ if track_event_telescope(type_id).is_some() => "tracking event",
        _ => return None,
    };
    Some(name)
}

/// How the reader locates the next top-level block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPolicy {
    /// Skip forward byte by byte until the next sync marker.
    #[default]
    Resync,
    /// Require a sync marker exactly where the previous block ended.
    Strict,
}

/// Default bound on telescope counts declared inside records.
pub const DEFAULT_MAX_TELESCOPES: usize = 16;

/// Reader configuration.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Synchronisation policy for top-level blocks.
    pub sync_policy: SyncPolicy,
    /// Largest telescope count accepted in run headers, central events and
    /// reconstructed showers.
    pub max_telescopes: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            sync_policy: SyncPolicy::Resync,
            max_telescopes: DEFAULT_MAX_TELESCOPES,
        }
    }
}
