// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

/// Chroma subsampling ratio of the encoded scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ChromaSampling {
    /// Full-resolution chroma (4:4:4).
    #[default]
    Cs444,
    /// Chroma halved in both axes (4:2:0).
    Cs420,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ColorSpace {
    /// Three-component YCbCr scan converted from the RGB input.
    #[default]
    Rgb,
    /// Single-component luma-only scan.
    Grayscale,
}

/// Where the entropy tables written to DHT come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TableSource {
    /// The fixed Annex K.3 tables; no extra pass over the image.
    #[default]
    Standard,
    /// Canonical tables built from a frequency scan of the actual
    /// coefficients. Smaller output, one more pass.
    Optimized,
}

pub struct EncodeOptions<'a> {
    /// Quality factor, 1..=100.
    pub quality: u32,
    /// Trade transform accuracy for throughput.
    pub fast_mode: bool,
    pub sampling: ChromaSampling,
    pub color_space: ColorSpace,
    pub tables: TableSource,
    /// Called with coarse completion percentages (0, 20, 30, ... 100).
    /// Purely observational; it cannot fail the encode.
    pub on_progress: Option<&'a mut dyn FnMut(u32)>,
}

impl<'a> EncodeOptions<'a> {
    pub fn new() -> EncodeOptions<'a> {
        EncodeOptions {
            quality: 75,
            fast_mode: false,
            sampling: ChromaSampling::default(),
            color_space: ColorSpace::default(),
            tables: TableSource::default(),
            on_progress: None,
        }
    }
}

impl<'a> Default for EncodeOptions<'a> {
    fn default() -> Self {
        Self::new()
    }
}

/// The encoded stream plus the parameters the caller needs to persist it.
#[derive(Clone, Debug)]
pub struct EncodedJpeg {
    pub bytes: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub quality: u32,
}
