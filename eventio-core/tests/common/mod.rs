//! Synthetic EventIO streams shared by the integration tests.

#![allow(dead_code)]

use eventio_core::{header, ByteOrder};

#[path = "../../src/test_support.rs"]
mod builders;

pub(crate) use builders::{block, nested_item, BodyWriter, ItemSpec};

/// A version 2 MC shower with `profiles` two-step profiles and extra parameters.
pub fn shower_v2(order: ByteOrder, shower_num: i32, profiles: i16) -> Vec<u8> {
    let mut w = BodyWriter::new(order)
        .i32(0)
        .f32(shower_num as f32 * 0.1)
        .f32(0.0)
        .f32(1.2217)
        .f32(0.0)
        .f32(21000.0)
        .f32(310.0)
        .f32(9000.0)
        .f32(300.0)
        .f32(320.0)
        .i16(profiles);
    for id in 0..profiles {
        w = w
            .i32(i32::from(id) + 1000)
            .i32(2)
            .f32(0.0)
            .f32(1000.0)
            .f32(10.0)
            .f32(20.0);
    }

    let extra = BodyWriter::new(order)
        .f32(1.0)
        .small_count(1)
        .small_count(0)
        .i32(shower_num)
        .finish();
    let body = w
        .raw(&nested_item(&ItemSpec::new(order, 1215, 1, shower_num), &extra))
        .finish();

    block(&ItemSpec::new(order, 2020, 2, shower_num), &body)
}

/// A version 0 MC shower without profiles.
pub fn shower_v0(order: ByteOrder, shower_num: i32) -> Vec<u8> {
    let body = BodyWriter::new(order)
        .i32(1)
        .f32(2.0)
        .f32(0.1)
        .f32(1.0)
        .f32(18000.0)
        .f32(280.0)
        .i16(0)
        .finish();
    block(&ItemSpec::new(order, 2020, 0, shower_num), &body)
}

/// A version 1 run header with telescopes 1 to `ntel`.
pub fn run_header_v1(order: ByteOrder, run: i32, ntel: i32) -> Vec<u8> {
    let mut w = BodyWriter::new(order)
        .i32(run)
        .i32(1_500_000_000)
        .i32(-1)
        .i32(0)
        .f32(3.0)
        .f32(1.22)
        .f32(0.0)
        .f32(0.0)
        .f32(0.0)
        .f32(0.0)
        .f32(0.0)
        .i32(ntel);
    for id in 0..ntel {
        w = w.i16(id as i16 + 1);
    }
    for id in 0..ntel {
        w = w.f32(id as f32 * 80.0).f32(-(id as f32) * 80.0).f32(10.0);
    }
    let body = w.i32(2).i32(0).string("MC ").string("").finish();
    block(&ItemSpec::new(order, 2000, 1, run), &body)
}
