// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Quality-scaled quantization tables and per-block (de)quantization.

use crate::error::{Error, Result};
use crate::BLOCK_SIZE;

/// Annex K.1 luminance base matrix, raster order.
pub const LUMA_BASE: [u16; BLOCK_SIZE] = [
    16, 11, 10, 16, 24, 40, 51, 61, //
    12, 12, 14, 19, 26, 58, 60, 55, //
    14, 13, 16, 24, 40, 57, 69, 56, //
    14, 17, 22, 29, 51, 87, 80, 62, //
    18, 22, 37, 56, 68, 109, 103, 77, //
    24, 35, 55, 64, 81, 104, 113, 92, //
    49, 64, 78, 87, 103, 121, 120, 101, //
    72, 92, 95, 98, 112, 100, 103, 99,
];

/// Annex K.2 chrominance base matrix, raster order.
pub const CHROMA_BASE: [u16; BLOCK_SIZE] = [
    17, 18, 24, 47, 99, 99, 99, 99, //
    18, 21, 26, 66, 99, 99, 99, 99, //
    24, 26, 56, 99, 99, 99, 99, 99, //
    47, 66, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99,
];

/// Scale factor applied to the base matrices for a quality setting.
pub fn scale_for_quality(quality: u32) -> Result<u32> {
    if quality == 0 || quality > 100 {
        return Err(Error::InvalidQuality(quality));
    }
    Ok(if quality < 50 {
        5000 / quality
    } else {
        200 - 2 * quality
    })
}

/// One quantization matrix plus its DQT table id (0 = luma, 1 = chroma).
///
/// Values are stored in raster order; the DQT marker serializes them in
/// zigzag order. The table written to the container is authoritative on
/// decode, the quality value it was derived from is advisory only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuantTable {
    pub index: u8,
    pub values: [u16; BLOCK_SIZE],
}

impl QuantTable {
    pub fn for_quality(quality: u32, chroma: bool) -> Result<QuantTable> {
        let scale = scale_for_quality(quality)?;
        let base = if chroma { &CHROMA_BASE } else { &LUMA_BASE };
        let mut values = [0u16; BLOCK_SIZE];
        for (v, &b) in values.iter_mut().zip(base.iter()) {
            *v = ((b as u32 * scale + 50) / 100).clamp(1, 255) as u16;
        }
        Ok(QuantTable {
            index: chroma as u8,
            values,
        })
    }

    pub fn from_values(index: u8, values: [u16; BLOCK_SIZE]) -> QuantTable {
        QuantTable { index, values }
    }

    /// Divides each coefficient by its table entry, rounding to nearest.
    pub fn quantize(&self, coeffs: &[f32], out: &mut [i32]) {
        debug_assert_eq!(coeffs.len(), BLOCK_SIZE);
        debug_assert_eq!(out.len(), BLOCK_SIZE);
        for i in 0..BLOCK_SIZE {
            out[i] = (coeffs[i] / self.values[i] as f32).round() as i32;
        }
    }

    /// Multiplies quantized coefficients back to approximate magnitudes.
    pub fn dequantize(&self, coeffs: &[i32], out: &mut [f32]) {
        debug_assert_eq!(coeffs.len(), BLOCK_SIZE);
        debug_assert_eq!(out.len(), BLOCK_SIZE);
        for i in 0..BLOCK_SIZE {
            out[i] = (coeffs[i] * self.values[i] as i32) as f32;
        }
    }
}
