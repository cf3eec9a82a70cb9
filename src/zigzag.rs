// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Zigzag coefficient reordering and AC run-length coding.

use crate::error::{Error, Result};
use crate::BLOCK_SIZE;

/// Maps sequence index 0..63 to the raster (row * 8 + col) position inside
/// a block. Low frequencies come first so AC zero runs cluster at the tail.
pub const ZIGZAG: [usize; BLOCK_SIZE] = [
    0, 1, 8, 16, 9, 2, 3, 10, //
    17, 24, 32, 25, 18, 11, 4, 5, //
    12, 19, 26, 33, 40, 48, 41, 34, //
    27, 20, 13, 6, 7, 14, 21, 28, //
    35, 42, 49, 56, 57, 50, 43, 36, //
    29, 22, 15, 23, 30, 37, 44, 51, //
    58, 59, 52, 45, 38, 31, 39, 46, //
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// Reorders a raster-order block into the zigzag sequence.
pub fn zigzag_forward<T: Copy>(block: &[T], seq: &mut [T]) -> Result<()> {
    if block.len() != BLOCK_SIZE {
        return Err(Error::InvalidBlock(block.len()));
    }
    if seq.len() != BLOCK_SIZE {
        return Err(Error::InvalidBlock(seq.len()));
    }
    for (i, &pos) in ZIGZAG.iter().enumerate() {
        seq[i] = block[pos];
    }
    Ok(())
}

/// Reorders a zigzag sequence back into a raster-order block.
pub fn zigzag_inverse<T: Copy>(seq: &[T], block: &mut [T]) -> Result<()> {
    if seq.len() != BLOCK_SIZE {
        return Err(Error::InvalidBlock(seq.len()));
    }
    if block.len() != BLOCK_SIZE {
        return Err(Error::InvalidBlock(block.len()));
    }
    for (i, &pos) in ZIGZAG.iter().enumerate() {
        block[pos] = seq[i];
    }
    Ok(())
}

/// Zero-run length before the EOB sentinel is forced, per the standard.
pub const MAX_RUN: u8 = 15;

/// Run-length encodes an AC coefficient sequence into (zero run, value)
/// pairs. Runs longer than 15 are split with (15, 0) pairs; a tail of zeros
/// collapses into a single (0, 0) end-of-block pair.
pub fn run_length_encode(data: &[i32]) -> Vec<(u8, i32)> {
    let mut pairs = Vec::new();
    let mut zero_run = 0u32;
    for &value in data {
        if value == 0 {
            zero_run += 1;
        } else {
            while zero_run > MAX_RUN as u32 {
                pairs.push((MAX_RUN, 0));
                zero_run -= 16;
            }
            pairs.push((zero_run as u8, value));
            zero_run = 0;
        }
    }
    if zero_run > 0 {
        pairs.push((0, 0));
    }
    pairs
}

/// Expands (zero run, value) pairs back into `len` AC coefficients,
/// zero-filling everything the pairs do not touch.
pub fn run_length_decode(pairs: &[(u8, i32)], len: usize) -> Result<Vec<i32>> {
    let mut data = vec![0i32; len];
    let mut pos = 0usize;
    for &(run, value) in pairs {
        if value == 0 {
            if run == 0 {
                // End of block; the rest stays zero.
                return Ok(data);
            }
            if run != MAX_RUN {
                return Err(Error::InvalidScanData("zero value with non-ZRL run"));
            }
            pos += 16;
            continue;
        }
        pos += run as usize;
        if pos >= len {
            return Err(Error::InvalidScanData("run past end of block"));
        }
        data[pos] = value;
        pos += 1;
    }
    Ok(data)
}
