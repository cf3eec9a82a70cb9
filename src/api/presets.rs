// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::api::options::EncodeOptions;
use crate::error::{Error, Result};

/// A named (quality, fast mode) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub quality: u32,
    pub fast_mode: bool,
    pub description: &'static str,
}

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "web",
        quality: 75,
        fast_mode: true,
        description: "Optimized for web delivery",
    },
    Preset {
        name: "print",
        quality: 90,
        fast_mode: false,
        description: "High quality for printing",
    },
    Preset {
        name: "archive",
        quality: 95,
        fast_mode: false,
        description: "Maximum quality for archival",
    },
    Preset {
        name: "thumbnail",
        quality: 60,
        fast_mode: true,
        description: "Small file size for thumbnails",
    },
    Preset {
        name: "balanced",
        quality: 85,
        fast_mode: false,
        description: "Balance between quality and size",
    },
];

/// Looks up a preset by name, case-insensitively.
pub fn preset(name: &str) -> Result<&'static Preset> {
    PRESETS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::UnknownPreset(name.to_string()))
}

impl Preset {
    /// Encode options with this preset applied and everything else default.
    pub fn options(&self) -> EncodeOptions<'static> {
        EncodeOptions {
            quality: self.quality,
            fast_mode: self.fast_mode,
            ..EncodeOptions::new()
        }
    }
}
