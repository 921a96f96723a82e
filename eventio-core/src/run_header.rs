//! Run header blocks (type 2000).

use crate::cursor::ByteCursor;
use crate::error::{EventIoError, Result};
use crate::header::BlockHeader;
use crate::plan::{apply_plan, plan_field, VersionedField};
use crate::types::{ReaderConfig, TYPE_RUN_HEADER};
use log::{debug, error};
use std::collections::HashMap;
use std::io::Read;

/// Newest run header version this decoder understands.
pub const MAX_RUN_HEADER_VERSION: u32 = 2;

/// Run-level settings of the telescope array.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunHeader {
    pub run: i32,
    /// Start of run, seconds since 1970-01-01 UTC.
    pub time: i32,
    pub run_type: i32,
    pub tracking_mode: i32,
    /// Reverse tracking flag, 0 for blocks before version 2.
    pub reverse_flag: i32,
    /// Pointing direction, azimuth and altitude [rad].
    pub direction: [f32; 2],
    /// Field-of-view offset [rad].
    pub offset_fov: [f32; 2],
    /// Convergence depth [g/cm^2].
    pub conv_depth: f32,
    /// Convergence reference position [m], zero before version 1.
    pub conv_ref_pos: [f32; 2],
    pub tel_id: Vec<i16>,
    /// Telescope positions x, y, z [m], one entry per telescope.
    pub tel_pos: Vec<[f32; 3]>,
    pub min_tel_trig: i32,
    /// Nominal run duration [s].
    pub duration: i32,
    pub target: String,
    pub observer: String,
    /// Telescope id to position in `tel_id`.
    tel_index: HashMap<i16, usize>,
}

impl RunHeader {
    /// Number of telescopes in the run.
    pub fn ntel(&self) -> usize {
        self.tel_id.len()
    }

    /// Position of telescope `tel_id` in the per-telescope lists, if the
    /// telescope takes part in the run.
    pub fn tel_index(&self, tel_id: i16) -> Option<usize> {
        self.tel_index.get(&tel_id).copied()
    }

    /// Rebuilds the id lookup from `tel_id`. Ids must be unique.
    fn index_telescopes(&mut self) -> Result<()> {
        self.tel_index.clear();
        for (index, &id) in self.tel_id.iter().enumerate() {
            if let Some(first) = self.tel_index.insert(id, index) {
                return Err(EventIoError::invalid(
                    "run header",
                    format!(
                        "telescope id {} listed at positions {} and {}",
                        id, first, index
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn run_header_plan<R: Read>() -> [VersionedField<RunHeader, R>; 9] {
    [
        plan_field!(RunHeader, "run", since 0, width 4, |h, c| h.run = c.read_i32()?),
        plan_field!(RunHeader, "time", since 0, width 4, |h, c| h.time = c.read_i32()?),
        plan_field!(RunHeader, "run_type", since 0, width 4, |h, c| h.run_type = c.read_i32()?),
        plan_field!(RunHeader, "tracking_mode", since 0, width 4, |h, c| h.tracking_mode = c.read_i32()?),
        plan_field!(RunHeader, "reverse_flag", since 2, width 4, |h, c| h.reverse_flag = c.read_i32()?),
        plan_field!(RunHeader, "direction", since 0, width 8, |h, c| h.direction = [c.read_f32()?, c.read_f32()?]),
        plan_field!(RunHeader, "offset_fov", since 0, width 8, |h, c| h.offset_fov = [c.read_f32()?, c.read_f32()?]),
        plan_field!(RunHeader, "conv_depth", since 0, width 4, |h, c| h.conv_depth = c.read_f32()?),
        plan_field!(RunHeader, "conv_ref_pos", since 1, width 8, |h, c| h.conv_ref_pos = [c.read_f32()?, c.read_f32()?]),
    ]
}

/// Decodes the body of a run header block.
///
/// The telescope count is bounded by [`ReaderConfig::max_telescopes`].
pub fn decode_run_header<R: Read>(
    header: &BlockHeader,
    cursor: &mut ByteCursor<R>,
    config: &ReaderConfig,
) -> Result<RunHeader> {
    if header.version > MAX_RUN_HEADER_VERSION {
        error!("Unsupported run header version {}", header.version);
        header.align_end(cursor)?;
        return Err(EventIoError::UnsupportedVersion {
            type_id: TYPE_RUN_HEADER,
            version: header.version,
            max: MAX_RUN_HEADER_VERSION,
        });
    }

    let body = read_run_header_body(header, cursor, config);
    header.conclude(cursor, body)
}

fn read_run_header_body<R: Read>(
    header: &BlockHeader,
    cursor: &mut ByteCursor<R>,
    config: &ReaderConfig,
) -> Result<RunHeader> {
    let mut run_header = RunHeader::default();
    apply_plan(&mut run_header, &run_header_plan(), header.version, cursor, header)?;

    header.ensure_remaining(cursor, 4)?;
    let ntel = cursor.read_i32()?;
    let ntel = usize::try_from(ntel)
        .ok()
        .filter(|&n| n <= config.max_telescopes)
        .ok_or_else(|| {
            EventIoError::invalid(
                "run header",
                format!(
                    "telescope count {} outside 0..={}",
                    ntel, config.max_telescopes
                ),
            )
        })?;

    // Ids (2 bytes), positions (12 bytes), then trigger minimum and duration.
    header.ensure_remaining(cursor, ntel as u64 * 14 + 8)?;
    run_header.tel_id = cursor.read_i16_vec(ntel)?;
    run_header.index_telescopes()?;
    run_header.tel_pos.reserve(ntel);
    for _ in 0..ntel {
        let position = [cursor.read_f32()?, cursor.read_f32()?, cursor.read_f32()?];
        run_header.tel_pos.push(position);
    }
    run_header.min_tel_trig = cursor.read_i32()?;
    run_header.duration = cursor.read_i32()?;

    run_header.target = header.read_string(cursor)?;
    run_header.observer = header.read_string(cursor)?;

    debug!(
        "Run {}: {} telescopes, target '{}'",
        run_header.run, ntel, run_header.target
    );
    Ok(run_header)
}
