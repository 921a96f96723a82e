//! MC shower blocks (type 2020) and their profile and extra-parameter
//! sub-records.
//!
//! Body layout, in block byte order:
//!
//! ```text
//! i32 primary id | f32 energy | f32 azimuth | f32 altitude
//! f32 depth_start                      (version >= 1)
//! f32 h_first_int | f32 xmax
//! f32 hmax | f32 emax | f32 cmax       (version >= 1)
//! i16 profile count, then per profile:
//!     i32 id | i32 steps | f32 start | f32 end | f32 x steps
//! nested item 1215 extra parameters    (version >= 2)
//! ```

use crate::cursor::ByteCursor;
use crate::error::{EventIoError, Result};
use crate::header::BlockHeader;
use crate::plan::{apply_plan, plan_field, VersionedField};
use crate::types::{TYPE_MC_SHOWER, TYPE_SHOWER_EXTRA_PARAMETERS};
use log::{debug, error, warn};
use std::io::Read;

/// Newest MC shower version this decoder understands.
pub const MAX_SHOWER_VERSION: u32 = 2;

/// Most profiles kept per shower. Further profiles are skipped.
pub const H_MAX_PROFILE: usize = 10;

/// The only extra-parameters item version in use.
const EXTRA_PARAMETERS_VERSION: u32 = 1;

/// Width of the fixed part of a profile: id, steps, start, end.
const PROFILE_FIXED_WIDTH: u64 = 16;

/// One longitudinal shower profile.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileEntry {
    /// Profile type, e.g. particle count or Cherenkov emission versus depth.
    pub id: i32,
    pub num_steps: i32,
    pub start: f32,
    pub end: f32,
    /// `(end - start) / num_steps`, or 0 without steps.
    pub bin_size: f32,
    pub content: Vec<f32>,
}

impl ProfileEntry {
    fn read<R: Read>(header: &BlockHeader, cursor: &mut ByteCursor<R>) -> Result<Self> {
        header.ensure_remaining(cursor, PROFILE_FIXED_WIDTH)?;
        let id = cursor.read_i32()?;
        let num_steps = cursor.read_i32()?;
        let start = cursor.read_f32()?;
        let end = cursor.read_f32()?;
        let steps = checked_steps(header, cursor, id, num_steps)?;

        let bin_size = if steps > 0 {
            (end - start) / num_steps as f32
        } else {
            0.0
        };
        Ok(Self {
            id,
            num_steps,
            start,
            end,
            bin_size,
            content: cursor.read_f32_vec(steps)?,
        })
    }

    /// Consumes one profile without keeping its content.
    fn skip<R: Read>(header: &BlockHeader, cursor: &mut ByteCursor<R>) -> Result<()> {
        header.ensure_remaining(cursor, PROFILE_FIXED_WIDTH)?;
        let id = cursor.read_i32()?;
        let num_steps = cursor.read_i32()?;
        cursor.skip(8)?;
        let steps = checked_steps(header, cursor, id, num_steps)?;
        cursor.skip(steps as u64 * 4)
    }
}

/// Validates a profile step count against the bytes left in the block.
fn checked_steps<R>(
    header: &BlockHeader,
    cursor: &ByteCursor<R>,
    id: i32,
    num_steps: i32,
) -> Result<usize> {
    let steps = usize::try_from(num_steps).map_err(|_| {
        EventIoError::malformed(
            "shower profile",
            format!("profile {} has negative step count {}", id, num_steps),
        )
    })?;
    let remaining = header.remaining(cursor);
    if steps as u64 * 4 > remaining {
        return Err(EventIoError::malformed(
            "shower profile",
            format!(
                "profile {} declares {} steps, only {} bytes left in block",
                id, steps, remaining
            ),
        ));
    }
    Ok(steps)
}

/// Optional per-shower parameters carried in a nested item.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraParameters {
    /// Identification of the nested item.
    pub id: i32,
    /// Set when the parameters were read from the stream.
    pub is_set: bool,
    pub weight: f32,
    pub iparam: Vec<i32>,
    pub fparam: Vec<f32>,
}

impl Default for ExtraParameters {
    fn default() -> Self {
        Self {
            id: 0,
            is_set: false,
            weight: 1.0,
            iparam: Vec::new(),
            fparam: Vec::new(),
        }
    }
}

impl ExtraParameters {
    /// Restores the cleared state used for showers without extra parameters.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Reads the nested extra-parameters item of a shower block.
    fn read<R: Read>(parent: &BlockHeader, cursor: &mut ByteCursor<R>) -> Result<Self> {
        let item =
            BlockHeader::read_nested_of_type(cursor, parent, TYPE_SHOWER_EXTRA_PARAMETERS)?;
        if item.version != EXTRA_PARAMETERS_VERSION {
            return Err(EventIoError::UnsupportedVersion {
                type_id: item.type_id,
                version: item.version,
                max: EXTRA_PARAMETERS_VERSION,
            });
        }
        let body = Self::read_body(&item, cursor);
        item.conclude(cursor, body)
    }

    fn read_body<R: Read>(item: &BlockHeader, cursor: &mut ByteCursor<R>) -> Result<Self> {
        item.ensure_remaining(cursor, 4)?;
        let weight = cursor.read_f32()?;
        let ni = item.read_count(cursor)?;
        let nf = item.read_count(cursor)?;

        let needed = ni.saturating_add(nf).saturating_mul(4);
        item.ensure_remaining(cursor, needed)?;
        let iparam = cursor.read_i32_vec(ni as usize)?;
        let fparam = cursor.read_f32_vec(nf as usize)?;

        Ok(Self {
            id: item.identification,
            is_set: true,
            weight,
            iparam,
            fparam,
        })
    }
}

/// A decoded MC shower.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShowerRecord {
    /// Shower number, taken from the block identification.
    pub shower_num: i32,
    /// Primary particle id in CORSIKA convention.
    pub primary_id: i32,
    /// Primary energy [TeV].
    pub energy: f32,
    /// Azimuth [rad].
    pub azimuth: f32,
    /// Altitude [rad].
    pub altitude: f32,
    /// Atmospheric depth where the primary started [g/cm^2].
    pub depth_start: Option<f32>,
    /// Height of first interaction a.s.l. [m].
    pub h_first_int: f32,
    /// Atmospheric depth of shower maximum [g/cm^2].
    pub xmax: f32,
    /// Height of shower maximum [m].
    pub hmax: f32,
    /// Depth of the electron number maximum.
    pub emax: f32,
    /// Depth of the Cherenkov emission maximum.
    pub cmax: f32,
    /// Profile count as declared in the block.
    pub num_profiles: i16,
    /// At most [`H_MAX_PROFILE`] profiles, in stream order.
    pub profiles: Vec<ProfileEntry>,
    pub extra: ExtraParameters,
}

/// Fixed fields preceding the profile count.
fn shower_plan<R: Read>() -> [VersionedField<ShowerRecord, R>; 10] {
    [
        plan_field!(ShowerRecord, "primary_id", since 0, width 4, |s, c| s.primary_id = c.read_i32()?),
        plan_field!(ShowerRecord, "energy", since 0, width 4, |s, c| s.energy = c.read_f32()?),
        plan_field!(ShowerRecord, "azimuth", since 0, width 4, |s, c| s.azimuth = c.read_f32()?),
        plan_field!(ShowerRecord, "altitude", since 0, width 4, |s, c| s.altitude = c.read_f32()?),
        plan_field!(ShowerRecord, "depth_start", since 1, width 4, |s, c| s.depth_start = Some(c.read_f32()?)),
        plan_field!(ShowerRecord, "h_first_int", since 0, width 4, |s, c| s.h_first_int = c.read_f32()?),
        plan_field!(ShowerRecord, "xmax", since 0, width 4, |s, c| s.xmax = c.read_f32()?),
        plan_field!(ShowerRecord, "hmax", since 1, width 4, |s, c| s.hmax = c.read_f32()?),
        plan_field!(ShowerRecord, "emax", since 1, width 4, |s, c| s.emax = c.read_f32()?),
        plan_field!(ShowerRecord, "cmax", since 1, width 4, |s, c| s.cmax = c.read_f32()?),
    ]
}

/// Decodes the body of an MC shower block.
///
/// The cursor is left at the declared block end whenever the result is `Ok`
/// or a recoverable error. Blocks newer than [`MAX_SHOWER_VERSION`] are
/// skipped and reported as [`EventIoError::UnsupportedVersion`].
pub fn decode_shower<R: Read>(
    header: &BlockHeader,
    cursor: &mut ByteCursor<R>,
) -> Result<ShowerRecord> {
    if header.version > MAX_SHOWER_VERSION {
        error!(
            "Unsupported MC shower version {} (shower {})",
            header.version, header.identification
        );
        header.align_end(cursor)?;
        return Err(EventIoError::UnsupportedVersion {
            type_id: TYPE_MC_SHOWER,
            version: header.version,
            max: MAX_SHOWER_VERSION,
        });
    }

    let body = read_shower_body(header, cursor);
    header.conclude(cursor, body)
}

fn read_shower_body<R: Read>(
    header: &BlockHeader,
    cursor: &mut ByteCursor<R>,
) -> Result<ShowerRecord> {
    let mut shower = ShowerRecord {
        shower_num: header.identification,
        ..Default::default()
    };
    apply_plan(&mut shower, &shower_plan(), header.version, cursor, header)?;

    header.ensure_remaining(cursor, 2)?;
    shower.num_profiles = cursor.read_i16()?;
    shower.profiles = read_profiles(header, cursor, shower.num_profiles).map_err(|err| {
        error!("Failed to read profiles of shower {}: {}", shower.shower_num, err);
        sub_record_error("shower profile", err)
    })?;

    if header.version >= 2 {
        shower.extra = ExtraParameters::read(header, cursor).map_err(|err| {
            error!(
                "Failed to read extra parameters of shower {}: {}",
                shower.shower_num, err
            );
            sub_record_error("shower extra parameters", err)
        })?;
    }

    debug!(
        "MC shower {}: primary {}, {} TeV, {} profiles",
        shower.shower_num,
        shower.primary_id,
        shower.energy,
        shower.profiles.len()
    );
    Ok(shower)
}

fn read_profiles<R: Read>(
    header: &BlockHeader,
    cursor: &mut ByteCursor<R>,
    declared: i16,
) -> Result<Vec<ProfileEntry>> {
    let declared = usize::try_from(declared).map_err(|_| {
        EventIoError::malformed(
            "shower profile",
            format!("negative profile count {}", declared),
        )
    })?;

    let kept = declared.min(H_MAX_PROFILE);
    let mut profiles = Vec::with_capacity(kept);
    for _ in 0..kept {
        profiles.push(ProfileEntry::read(header, cursor)?);
    }

    if declared > kept {
        warn!(
            "Shower {} declares {} profiles, keeping the first {}",
            header.identification, declared, H_MAX_PROFILE
        );
        for _ in kept..declared {
            ProfileEntry::skip(header, cursor)?;
        }
    }
    Ok(profiles)
}

/// Reports a failed sub-record as a malformed record.
///
/// Fatal stream errors pass through unchanged.
fn sub_record_error(record: &'static str, err: EventIoError) -> EventIoError {
    match err {
        EventIoError::MalformedSubRecord { .. } => err,
        err if !err.is_recoverable() => err,
        err => EventIoError::malformed(record, err.to_string()),
    }
}
