//! Reconstructed shower parameter blocks (type 2015).
//!
//! The identification is a bit pattern of the result groups present in the
//! body. Groups that are absent keep their defaults.

use crate::cursor::ByteCursor;
use crate::error::{EventIoError, Result};
use crate::header::BlockHeader;
use crate::plan::{apply_plan, plan_field, VersionedField};
use crate::types::{ReaderConfig, TYPE_SHOWER};
use log::{debug, error};
use std::io::Read;
use std::slice;

/// Newest reconstructed shower version this decoder understands.
pub const MAX_SHOWER_PARAMETERS_VERSION: u32 = 2;

/// Result group bits of the identification.
pub const RESULT_DIRECTION: u32 = 0x001;
pub const RESULT_DIRECTION_ERROR: u32 = 0x002;
pub const RESULT_CORE: u32 = 0x004;
pub const RESULT_CORE_ERROR: u32 = 0x008;
pub const RESULT_SCALED_SHAPE: u32 = 0x010;
pub const RESULT_SCALED_SHAPE_ERROR: u32 = 0x020;
pub const RESULT_ENERGY: u32 = 0x040;
pub const RESULT_ENERGY_ERROR: u32 = 0x080;
pub const RESULT_XMAX: u32 = 0x100;
pub const RESULT_XMAX_ERROR: u32 = 0x200;

/// Bit and float count of each result group, in stream order.
const RESULT_GROUPS: [(u32, u64); 10] = [
    (RESULT_DIRECTION, 2),
    (RESULT_DIRECTION_ERROR, 3),
    (RESULT_CORE, 2),
    (RESULT_CORE_ERROR, 3),
    (RESULT_SCALED_SHAPE, 2),
    (RESULT_SCALED_SHAPE_ERROR, 2),
    (RESULT_ENERGY, 1),
    (RESULT_ENERGY_ERROR, 1),
    (RESULT_XMAX, 1),
    (RESULT_XMAX_ERROR, 1),
];

/// Shower direction, core, shape, energy and maximum reconstructed from
/// the telescope images of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowerParameters {
    /// Which result groups are present, see the `RESULT_*` bits.
    pub result_bits: u32,
    /// Telescopes contributing to the central trigger.
    pub num_trg: i16,
    /// Telescopes read out.
    pub num_read: i16,
    /// Images used for the reconstruction.
    pub num_img: i16,
    /// Bit pattern of the telescopes used, 0 before version 1.
    pub img_pattern: i32,
    /// Telescopes used, empty before version 2.
    pub img_list: Vec<i16>,
    /// Azimuth [rad from N towards E].
    pub azimuth: f32,
    /// Altitude [rad].
    pub altitude: f32,
    /// Direction error along x, along y and their correlation [rad].
    pub err_dir: [f32; 3],
    /// Core position x, y [m].
    pub core: [f32; 2],
    /// Core error along x, along y and their correlation [m].
    pub err_core: [f32; 3],
    /// Mean scaled image length, -1 when unknown.
    pub mean_scaled_length: f32,
    /// Mean scaled image width, -1 when unknown.
    pub mean_scaled_width: f32,
    pub err_mean_scaled_length: f32,
    pub err_mean_scaled_width: f32,
    /// Primary energy assuming a gamma [TeV], -1 when unknown.
    pub energy: f32,
    pub err_energy: f32,
    /// Atmospheric depth of the shower maximum [g/cm^2].
    pub xmax: f32,
    pub err_xmax: f32,
}

impl Default for ShowerParameters {
    fn default() -> Self {
        Self {
            result_bits: 0,
            num_trg: 0,
            num_read: 0,
            num_img: 0,
            img_pattern: 0,
            img_list: Vec::new(),
            azimuth: 0.0,
            altitude: 0.0,
            err_dir: [0.0; 3],
            core: [0.0; 2],
            err_core: [0.0; 3],
            mean_scaled_length: -1.0,
            mean_scaled_width: -1.0,
            err_mean_scaled_length: 0.0,
            err_mean_scaled_width: 0.0,
            energy: -1.0,
            err_energy: 0.0,
            xmax: 0.0,
            err_xmax: 0.0,
        }
    }
}

impl ShowerParameters {
    /// Returns `true` if every group in `bits` is present.
    pub fn has(&self, bits: u32) -> bool {
        self.result_bits & bits == bits
    }
}

fn shower_parameters_plan<R: Read>() -> [VersionedField<ShowerParameters, R>; 4] {
    [
        plan_field!(ShowerParameters, "num_trg", since 0, width 2, |p, c| p.num_trg = c.read_i16()?),
        plan_field!(ShowerParameters, "num_read", since 0, width 2, |p, c| p.num_read = c.read_i16()?),
        plan_field!(ShowerParameters, "num_img", since 0, width 2, |p, c| p.num_img = c.read_i16()?),
        plan_field!(ShowerParameters, "img_pattern", since 1, width 4, |p, c| p.img_pattern = c.read_i32()?),
    ]
}

/// Decodes the body of a reconstructed shower block.
///
/// From version 2 on the image list length is bounded by
/// [`ReaderConfig::max_telescopes`].
pub fn decode_shower_parameters<R: Read>(
    header: &BlockHeader,
    cursor: &mut ByteCursor<R>,
    config: &ReaderConfig,
) -> Result<ShowerParameters> {
    if header.version > MAX_SHOWER_PARAMETERS_VERSION {
        error!("Unsupported reconstructed shower version {}", header.version);
        header.align_end(cursor)?;
        return Err(EventIoError::UnsupportedVersion {
            type_id: TYPE_SHOWER,
            version: header.version,
            max: MAX_SHOWER_PARAMETERS_VERSION,
        });
    }

    let body = read_shower_parameters_body(header, cursor, config);
    header.conclude(cursor, body)
}

fn read_shower_parameters_body<R: Read>(
    header: &BlockHeader,
    cursor: &mut ByteCursor<R>,
    config: &ReaderConfig,
) -> Result<ShowerParameters> {
    let mut params = ShowerParameters {
        result_bits: header.identification as u32,
        ..Default::default()
    };
    apply_plan(
        &mut params,
        &shower_parameters_plan(),
        header.version,
        cursor,
        header,
    )?;

    if header.version >= 2 {
        let num_img = usize::try_from(params.num_img)
            .ok()
            .filter(|&n| n <= config.max_telescopes)
            .ok_or_else(|| {
                EventIoError::invalid(
                    "reconstructed shower",
                    format!(
                        "image count {} outside 0..={}",
                        params.num_img, config.max_telescopes
                    ),
                )
            })?;
        header.ensure_remaining(cursor, num_img as u64 * 2)?;
        params.img_list = cursor.read_i16_vec(num_img)?;
    }

    let floats: u64 = RESULT_GROUPS
        .iter()
        .filter(|(bit, _)| params.result_bits & bit != 0)
        .map(|(_, count)| count)
        .sum();
    header.ensure_remaining(cursor, floats * 4)?;

    let bits = params.result_bits;
    let mut direction = [params.azimuth, params.altitude];
    read_group(cursor, bits, RESULT_DIRECTION, &mut direction)?;
    read_group(cursor, bits, RESULT_DIRECTION_ERROR, &mut params.err_dir)?;
    read_group(cursor, bits, RESULT_CORE, &mut params.core)?;
    read_group(cursor, bits, RESULT_CORE_ERROR, &mut params.err_core)?;
    let mut shape = [params.mean_scaled_length, params.mean_scaled_width];
    read_group(cursor, bits, RESULT_SCALED_SHAPE, &mut shape)?;
    let mut shape_error = [params.err_mean_scaled_length, params.err_mean_scaled_width];
    read_group(cursor, bits, RESULT_SCALED_SHAPE_ERROR, &mut shape_error)?;
    read_group(cursor, bits, RESULT_ENERGY, slice::from_mut(&mut params.energy))?;
    read_group(cursor, bits, RESULT_ENERGY_ERROR, slice::from_mut(&mut params.err_energy))?;
    read_group(cursor, bits, RESULT_XMAX, slice::from_mut(&mut params.xmax))?;
    read_group(cursor, bits, RESULT_XMAX_ERROR, slice::from_mut(&mut params.err_xmax))?;

    [params.azimuth, params.altitude] = direction;
    [params.mean_scaled_length, params.mean_scaled_width] = shape;
    [params.err_mean_scaled_length, params.err_mean_scaled_width] = shape_error;

    debug!(
        "Reconstructed shower {:#x}: {} images, {} TeV",
        params.result_bits, params.num_img, params.energy
    );
    Ok(params)
}

/// Overwrites `values` from the stream when `bit` is set in `bits`.
fn read_group<R: Read>(
    cursor: &mut ByteCursor<R>,
    bits: u32,
    bit: u32,
    values: &mut [f32],
) -> Result<()> {
    if bits & bit != 0 {
        for value in values.iter_mut() {
            *value = cursor.read_f32()?;
        }
    }
    Ok(())
}
