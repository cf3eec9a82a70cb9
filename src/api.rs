// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

pub mod options;
pub mod presets;

pub use options::{ChromaSampling, ColorSpace, EncodeOptions, EncodedJpeg, TableSource};
pub use presets::{preset, Preset, PRESETS};
