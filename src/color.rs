// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! RGB <-> YCbCr conversion with the ITU-R BT.601 coefficients.

use crate::error::Result;
use crate::image::{Image, Plane};

pub fn rgb_to_ycbcr(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = -0.169 * r - 0.331 * g + 0.499 * b + 128.0;
    let cr = 0.499 * r - 0.419 * g - 0.0813 * b + 128.0;
    (y, cb, cr)
}

pub fn ycbcr_to_rgb(y: f32, cb: f32, cr: f32) -> (f32, f32, f32) {
    let r = y + 1.402 * (cr - 128.0);
    let g = y - 0.344136 * (cb - 128.0) - 0.714136 * (cr - 128.0);
    let b = y + 1.772 * (cb - 128.0);
    (r, g, b)
}

/// Converts an interleaved image to Y, Cb and Cr planes in one pass.
/// Alpha, if present, is dropped.
pub fn to_planes(image: &Image) -> Result<[Plane; 3]> {
    let size = image.size();
    let mut y_plane = Plane::new(size)?;
    let mut cb_plane = Plane::new(size)?;
    let mut cr_plane = Plane::new(size)?;
    for row in 0..size.1 {
        for col in 0..size.0 {
            let px = image.pixel(col, row);
            let (y, cb, cr) = rgb_to_ycbcr(px[0] as f32, px[1] as f32, px[2] as f32);
            y_plane.set(col, row, y);
            cb_plane.set(col, row, cb);
            cr_plane.set(col, row, cr);
        }
    }
    Ok([y_plane, cb_plane, cr_plane])
}

/// Converts an interleaved image to a single luma plane.
pub fn to_luma(image: &Image) -> Result<Plane> {
    let size = image.size();
    let mut y_plane = Plane::new(size)?;
    for row in 0..size.1 {
        for col in 0..size.0 {
            let px = image.pixel(col, row);
            let (y, _, _) = rgb_to_ycbcr(px[0] as f32, px[1] as f32, px[2] as f32);
            y_plane.set(col, row, y);
        }
    }
    Ok(y_plane)
}

fn to_sample(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Reassembles an RGBA image from Y, Cb and Cr planes of equal size.
/// Samples are clamped to the valid range here, not earlier.
pub fn from_planes(y: &Plane, cb: &Plane, cr: &Plane) -> Result<Image> {
    let size = y.size();
    debug_assert_eq!(size, cb.size());
    debug_assert_eq!(size, cr.size());
    let mut data = Vec::with_capacity(size.0 * size.1 * 4);
    for row in 0..size.1 {
        for col in 0..size.0 {
            let (r, g, b) = ycbcr_to_rgb(y.get(col, row), cb.get(col, row), cr.get(col, row));
            data.extend_from_slice(&[to_sample(r), to_sample(g), to_sample(b), 255]);
        }
    }
    Image::new(size, 4, data)
}

/// Reassembles an RGBA image from a lone luma plane.
pub fn from_luma(y: &Plane) -> Result<Image> {
    let size = y.size();
    let mut data = Vec::with_capacity(size.0 * size.1 * 4);
    for row in 0..size.1 {
        for col in 0..size.0 {
            let v = to_sample(y.get(col, row));
            data.extend_from_slice(&[v, v, v, 255]);
        }
    }
    Image::new(size, 4, data)
}
