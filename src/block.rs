// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Plane tiling: padding, 8x8 block extraction and reassembly, chroma
//! resampling, and the MCU geometry shared by encode and decode.

use crate::error::{Error, Result};
use crate::image::Plane;
use crate::{BLOCK_DIM, BLOCK_SIZE};

pub type SampleBlock = [f32; BLOCK_SIZE];

/// Quantized coefficients of one block, zigzag order.
pub type CoeffBlock = [i32; BLOCK_SIZE];

/// Per-component block geometry for one frame.
///
/// `h_samp`/`v_samp` are the JPEG sampling factors, i.e. how many blocks of
/// this component one MCU holds in each axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentLayout {
    pub h_samp: usize,
    pub v_samp: usize,
    pub blocks_wide: usize,
    pub blocks_high: usize,
}

impl ComponentLayout {
    pub fn num_blocks(&self) -> usize {
        self.blocks_wide * self.blocks_high
    }

    /// Padded plane size covered by this component's blocks.
    pub fn plane_size(&self) -> (usize, usize) {
        (self.blocks_wide * BLOCK_DIM, self.blocks_high * BLOCK_DIM)
    }

    /// Raster index of block `(bx, by)` of MCU `(mcu_x, mcu_y)`.
    pub fn block_index(&self, mcu_x: usize, mcu_y: usize, bx: usize, by: usize) -> usize {
        (mcu_y * self.v_samp + by) * self.blocks_wide + mcu_x * self.h_samp + bx
    }
}

/// MCU grid for an image of the given size and per-component sampling
/// factors. Block counts are rounded up so every MCU is complete.
#[derive(Clone, Debug)]
pub struct McuGeometry {
    pub mcus_x: usize,
    pub mcus_y: usize,
    pub components: Vec<ComponentLayout>,
}

pub fn mcu_geometry(size: (usize, usize), samplings: &[(usize, usize)]) -> McuGeometry {
    let h_max = samplings.iter().map(|s| s.0).max().unwrap_or(1);
    let v_max = samplings.iter().map(|s| s.1).max().unwrap_or(1);
    let mcus_x = size.0.div_ceil(BLOCK_DIM * h_max);
    let mcus_y = size.1.div_ceil(BLOCK_DIM * v_max);
    let components = samplings
        .iter()
        .map(|&(h, v)| ComponentLayout {
            h_samp: h,
            v_samp: v,
            blocks_wide: mcus_x * h,
            blocks_high: mcus_y * v,
        })
        .collect();
    McuGeometry {
        mcus_x,
        mcus_y,
        components,
    }
}

/// Grows a plane to `target` by replicating the last valid row and column.
/// Replication keeps padded blocks flat instead of introducing an artificial
/// edge at the image boundary.
pub fn pad_plane(plane: &Plane, target: (usize, usize)) -> Result<Plane> {
    let (width, height) = plane.size();
    debug_assert!(target.0 >= width && target.1 >= height);
    if target == plane.size() {
        return Ok(plane.clone());
    }
    let mut out = Plane::new(target)?;
    for y in 0..target.1 {
        let src_y = y.min(height - 1);
        let (head, tail) = out.row_mut(y).split_at_mut(width);
        head.copy_from_slice(plane.row(src_y));
        tail.fill(plane.get(width - 1, src_y));
    }
    Ok(out)
}

/// Splits a plane into 8x8 blocks in raster order. The plane dimensions
/// must already be multiples of the block size.
pub fn split_into_blocks(plane: &Plane) -> Result<Vec<SampleBlock>> {
    let (width, height) = plane.size();
    if width % BLOCK_DIM != 0 || height % BLOCK_DIM != 0 {
        return Err(Error::InvalidImageSize(width, height));
    }
    let blocks_wide = width / BLOCK_DIM;
    let blocks_high = height / BLOCK_DIM;
    let mut blocks = vec![[0.0; BLOCK_SIZE]; blocks_wide * blocks_high];
    for by in 0..blocks_high {
        for bx in 0..blocks_wide {
            let block = &mut blocks[by * blocks_wide + bx];
            for y in 0..BLOCK_DIM {
                let row = plane.row(by * BLOCK_DIM + y);
                let src = &row[bx * BLOCK_DIM..(bx + 1) * BLOCK_DIM];
                block[y * BLOCK_DIM..(y + 1) * BLOCK_DIM].copy_from_slice(src);
            }
        }
    }
    Ok(blocks)
}

/// Inverse of [`split_into_blocks`].
pub fn assemble_plane(
    blocks: &[SampleBlock],
    blocks_wide: usize,
    blocks_high: usize,
) -> Result<Plane> {
    debug_assert_eq!(blocks.len(), blocks_wide * blocks_high);
    let mut plane = Plane::new((blocks_wide * BLOCK_DIM, blocks_high * BLOCK_DIM))?;
    for by in 0..blocks_high {
        for bx in 0..blocks_wide {
            let block = &blocks[by * blocks_wide + bx];
            for y in 0..BLOCK_DIM {
                let row = plane.row_mut(by * BLOCK_DIM + y);
                row[bx * BLOCK_DIM..(bx + 1) * BLOCK_DIM]
                    .copy_from_slice(&block[y * BLOCK_DIM..(y + 1) * BLOCK_DIM]);
            }
        }
    }
    Ok(plane)
}

/// Halves a plane in both axes by averaging each 2x2 quad; odd trailing
/// samples reuse the last valid row/column.
pub fn downsample_2x(plane: &Plane) -> Result<Plane> {
    let (width, height) = plane.size();
    let out_size = (width.div_ceil(2), height.div_ceil(2));
    let mut out = Plane::new(out_size)?;
    for y in 0..out_size.1 {
        let y0 = 2 * y;
        let y1 = (2 * y + 1).min(height - 1);
        for x in 0..out_size.0 {
            let x0 = 2 * x;
            let x1 = (2 * x + 1).min(width - 1);
            let sum =
                plane.get(x0, y0) + plane.get(x1, y0) + plane.get(x0, y1) + plane.get(x1, y1);
            out.set(x, y, sum * 0.25);
        }
    }
    Ok(out)
}

/// Doubles a plane in both axes by sample replication.
pub fn upsample_2x(plane: &Plane) -> Result<Plane> {
    let (width, height) = plane.size();
    let mut out = Plane::new((width * 2, height * 2))?;
    for y in 0..height * 2 {
        let src = plane.row(y / 2);
        let dst = out.row_mut(y);
        for (x, v) in dst.iter_mut().enumerate() {
            *v = src[x / 2];
        }
    }
    Ok(out)
}

/// Returns the top-left `size` region of a plane.
pub fn crop_plane(plane: &Plane, size: (usize, usize)) -> Result<Plane> {
    debug_assert!(size.0 <= plane.width() && size.1 <= plane.height());
    if size == plane.size() {
        return Ok(plane.clone());
    }
    let mut out = Plane::new(size)?;
    for y in 0..size.1 {
        out.row_mut(y).copy_from_slice(&plane.row(y)[..size.0]);
    }
    Ok(out)
}
