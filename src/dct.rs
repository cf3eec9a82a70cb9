// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Forward and inverse 8x8 DCT-II with the JPEG level shift, plus a cheap
//! approximate forward transform for fast mode.

use std::f64::consts::{FRAC_1_SQRT_2, PI};
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::{BLOCK_DIM, BLOCK_SIZE};

const LEVEL_SHIFT: f64 = 128.0;

#[inline(always)]
fn alpha(u: usize) -> f64 {
    if u == 0 {
        FRAC_1_SQRT_2
    } else {
        1.0
    }
}

/// `basis[x][u] = cos((2x + 1) * u * pi / 16)`, shared by every block in the
/// process. The basis only depends on the block size, so it is computed once.
fn cos_basis() -> &'static [[f64; BLOCK_DIM]; BLOCK_DIM] {
    static COS_BASIS: OnceLock<[[f64; BLOCK_DIM]; BLOCK_DIM]> = OnceLock::new();
    COS_BASIS.get_or_init(|| {
        array_init::array_init(|x| {
            array_init::array_init(|u| {
                ((2 * x + 1) as f64 * u as f64 * PI / (2.0 * BLOCK_DIM as f64)).cos()
            })
        })
    })
}

fn check_block(len: usize) -> Result<()> {
    if len != BLOCK_SIZE {
        return Err(Error::InvalidBlock(len));
    }
    Ok(())
}

/// Forward transform of one level-shifted block.
///
/// `coeffs[u * 8 + v] = 1/4 C(u) C(v) sum_{x,y} (samples[x * 8 + y] - 128)
/// cos((2x+1)u pi/16) cos((2y+1)v pi/16)`.
pub fn forward_dct(samples: &[f32], coeffs: &mut [f32]) -> Result<()> {
    check_block(samples.len())?;
    check_block(coeffs.len())?;
    let basis = cos_basis();
    for u in 0..BLOCK_DIM {
        for v in 0..BLOCK_DIM {
            let mut sum = 0.0f64;
            for x in 0..BLOCK_DIM {
                for y in 0..BLOCK_DIM {
                    sum += (samples[x * BLOCK_DIM + y] as f64 - LEVEL_SHIFT)
                        * basis[x][u]
                        * basis[y][v];
                }
            }
            coeffs[u * BLOCK_DIM + v] = (0.25 * alpha(u) * alpha(v) * sum) as f32;
        }
    }
    Ok(())
}

/// Inverse transform; output samples are rounded and level-shifted back but
/// not clamped (clamping happens at final image reconstruction).
pub fn inverse_dct(coeffs: &[f32], samples: &mut [f32]) -> Result<()> {
    check_block(coeffs.len())?;
    check_block(samples.len())?;
    let basis = cos_basis();
    for x in 0..BLOCK_DIM {
        for y in 0..BLOCK_DIM {
            let mut sum = 0.0f64;
            for u in 0..BLOCK_DIM {
                for v in 0..BLOCK_DIM {
                    sum += alpha(u)
                        * alpha(v)
                        * coeffs[u * BLOCK_DIM + v] as f64
                        * basis[x][u]
                        * basis[y][v];
                }
            }
            samples[x * BLOCK_DIM + y] = (0.25 * sum + LEVEL_SHIFT).round() as f32;
        }
    }
    Ok(())
}

/// Fast-mode forward transform: the DC term is exact, AC terms are a crude
/// per-position approximation. Keeps the DC/AC split the downstream stages
/// rely on while skipping the double summation.
pub fn forward_dct_fast(samples: &[f32], coeffs: &mut [f32]) -> Result<()> {
    check_block(samples.len())?;
    check_block(coeffs.len())?;
    let mut sum = 0.0f64;
    for &s in samples {
        sum += s as f64 - LEVEL_SHIFT;
    }
    for (c, &s) in coeffs.iter_mut().zip(samples) {
        *c = (s as f64 - LEVEL_SHIFT) as f32 * 0.25;
    }
    coeffs[0] = (sum / BLOCK_DIM as f64) as f32;
    Ok(())
}
